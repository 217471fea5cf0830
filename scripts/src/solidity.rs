//! Definitions of the Solidity interfaces called by the scripts

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IOwnable {
        function owner() external view returns (address);
    }

    #[sol(rpc)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }

    #[sol(rpc)]
    interface ILiquidityHandler {
        function minExecutionOrderFee() external view returns (uint256);
        function createAddLiquidityOrder(
            address tokenIn,
            uint256 amountIn,
            uint256 minOut,
            uint256 executionFee,
            bool shouldWrap
        ) external payable returns (uint256);
        function executeOrder(
            uint256 endIndex,
            address feeReceiver,
            bytes32[] calldata priceData,
            bytes32[] calldata publishTimeData,
            uint256 minPublishTime,
            bytes32 encodedVaas
        ) external;
    }

    #[sol(rpc)]
    interface IVaultStorage {
        function setStrategyAllowance(address token, address strategy, address target) external;
    }

    #[sol(rpc)]
    interface IConfigStorage {
        #[derive(Debug)]
        struct LiquidityConfig {
            uint256 plpTotalTokenWeight;
            uint32 plpSafetyBufferBPS;
            uint32 taxFeeRateBPS;
            uint32 flashLoanFeeRateBPS;
            uint32 maxPLPUtilizationBPS;
            uint32 depositFeeRateBPS;
            uint32 withdrawFeeRateBPS;
            bool dynamicFeeEnabled;
            bool enabled;
        }

        function initialize() external;
        function getLiquidityConfig() external view returns (LiquidityConfig memory);
    }

    #[sol(rpc)]
    interface ISafe {
        function nonce() external view returns (uint256);
    }

    /// The EIP-712 struct signed by Safe owners
    struct SafeTx {
        address to;
        uint256 value;
        bytes data;
        uint8 operation;
        uint256 safeTxGas;
        uint256 baseGas;
        uint256 gasPrice;
        address gasToken;
        address refundReceiver;
        uint256 nonce;
    }
}
