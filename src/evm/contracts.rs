//! Contract bindings used while resolving a pair.
//!
//! Only the handful of read-only methods the scanner calls are declared. Fee accessors are
//! decoded as `uint256` because forks disagree on the width (`uint24`, `uint32`, ...) and a
//! wider decode accepts all of them.

use alloy::sol;

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    interface IPair {
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    interface IERC20Metadata {
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    interface IDynamicFee {
        function swapFee() external view returns (uint256);
        function getSwapFee() external view returns (uint256);
        function fee() external view returns (uint256);
    }
}
