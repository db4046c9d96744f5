//! The functions the client invokes on the GOF token, the collateral token and the NFT.

use alloy_sol_types::sol;

use crate::{
    model::{Address, U256},
    rpc::{ContractCall, View},
};

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IGof {
        function requiredCollateralForMint(uint256 amount) external view returns (uint256);
        function getGoldPrice() external view returns (uint256);
        function collateralRatioPct() external view returns (uint256);
        function redeemFeeBps() external view returns (uint256);
        function mintWithCollateral(uint256 amount) external;
        function redeem(uint256 amount) external;
    }

    interface INft {
        function mintPrice() external view returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
        function mint() external;
    }
}

/// Deployed addresses of the contracts the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contracts {
    pub gof: Address,
    pub collateral: Address,
    pub nft: Option<Address>,
}

impl Contracts {
    pub fn gof_balance(&self, owner: Address) -> View<IERC20::balanceOfCall> {
        View::new(self.gof, &IERC20::balanceOfCall { owner })
    }

    pub fn collateral_balance(&self, owner: Address) -> View<IERC20::balanceOfCall> {
        View::new(self.collateral, &IERC20::balanceOfCall { owner })
    }

    pub fn required_collateral(
        &self,
        mint_amount_wei: U256,
    ) -> View<IGof::requiredCollateralForMintCall> {
        View::new(
            self.gof,
            &IGof::requiredCollateralForMintCall {
                amount: mint_amount_wei,
            },
        )
    }

    /// Collateral `owner` lets the GOF contract pull.
    pub fn allowance(&self, owner: Address) -> View<IERC20::allowanceCall> {
        View::new(
            self.collateral,
            &IERC20::allowanceCall {
                owner,
                spender: self.gof,
            },
        )
    }

    pub fn gold_price(&self) -> View<IGof::getGoldPriceCall> {
        View::new(self.gof, &IGof::getGoldPriceCall {})
    }

    pub fn collateral_ratio_pct(&self) -> View<IGof::collateralRatioPctCall> {
        View::new(self.gof, &IGof::collateralRatioPctCall {})
    }

    pub fn redeem_fee_bps(&self) -> View<IGof::redeemFeeBpsCall> {
        View::new(self.gof, &IGof::redeemFeeBpsCall {})
    }

    pub fn approve_collateral(&self, amount: U256) -> ContractCall {
        ContractCall::new(
            self.collateral,
            &IERC20::approveCall {
                spender: self.gof,
                amount,
            },
        )
    }

    pub fn mint_with_collateral(&self, amount_wei: U256) -> ContractCall {
        ContractCall::new(
            self.gof,
            &IGof::mintWithCollateralCall { amount: amount_wei },
        )
    }

    pub fn redeem(&self, amount_wei: U256) -> ContractCall {
        ContractCall::new(self.gof, &IGof::redeemCall { amount: amount_wei })
    }

    pub fn nft_mint_price(&self) -> Option<View<INft::mintPriceCall>> {
        self.nft
            .map(|nft| View::new(nft, &INft::mintPriceCall {}))
    }

    /// Collateral `owner` lets the NFT contract pull.
    pub fn nft_allowance(&self, owner: Address) -> Option<View<IERC20::allowanceCall>> {
        self.nft.map(|nft| {
            View::new(
                self.collateral,
                &IERC20::allowanceCall {
                    owner,
                    spender: nft,
                },
            )
        })
    }

    pub fn nft_balance(&self, owner: Address) -> Option<View<INft::balanceOfCall>> {
        self.nft
            .map(|nft| View::new(nft, &INft::balanceOfCall { owner }))
    }

    pub fn nft_approve(&self, price: U256) -> Option<ContractCall> {
        self.nft.map(|nft| {
            ContractCall::new(
                self.collateral,
                &IERC20::approveCall {
                    spender: nft,
                    amount: price,
                },
            )
        })
    }

    pub fn nft_mint(&self) -> Option<ContractCall> {
        self.nft
            .map(|nft| ContractCall::new(nft, &INft::mintCall {}))
    }
}
