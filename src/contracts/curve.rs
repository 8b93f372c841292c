use ethers::prelude::*;

// Shared by every factory generation on mainnet
abigen!(
    ICurveFactory,
    r#"[
        function pool_count() external view returns (uint256)
        function pool_list(uint256) external view returns (address)
    ]"#
);

// Stableswap pools index coins with int128
abigen!(
    ICurveStablePool,
    r#"[
        function coins(uint256) external view returns (address)
        function get_dy(int128 i, int128 j, uint256 dx) external view returns (uint256)
    ]"#
);

// Cryptoswap pools index coins with uint256
abigen!(
    ICurveCryptoPool,
    r#"[
        function coins(uint256) external view returns (address)
        function get_dy(uint256 i, uint256 j, uint256 dx) external view returns (uint256)
    ]"#
);

abigen!(
    ICurveRouterNg,
    r#"[
        function exchange(address[11] _route, uint256[5][5] _swap_params, uint256 _amount, uint256 _expected) external payable returns (uint256)
    ]"#
);
