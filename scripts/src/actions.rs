//! The actions the scripts can take, each with a pure calldata encoding

use std::fmt::{self, Display};

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    sol_types::{SolCall, SolValue},
};

use crate::{
    address_book::AddressCategory,
    constants::{
        APPROVE_GAS_LIMIT, CONFIG_CALL_GAS_LIMIT, CREATE_ORDER_GAS_LIMIT, DEPLOY_GAS_LIMIT,
        EXECUTE_ORDER_GAS_LIMIT,
    },
    errors::ScriptError,
    price::{PriceObservation, PricePayload},
    solidity::{IConfigStorage, ILiquidityHandler, IVaultStorage, IERC20},
    types::ActionRequest,
};

/// How an action is authorized and what it leaves behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    /// Callable by anyone, executed directly by the caller
    Operational,
    /// Gated on the target's owner, possibly routed through the multisig
    Privileged,
    /// Creates a contract whose address is recorded in the address book
    Deployment,
}

/// A token allowance that must be in place before an action is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowancePrecondition {
    /// The token to be spent
    pub token: Address,
    /// The contract spending the token
    pub spender: Address,
    /// The minimum allowance required
    pub amount: U256,
}

impl AllowancePrecondition {
    /// The approval granting the spender an unlimited allowance
    pub fn approval_request(&self) -> ActionRequest {
        let calldata = IERC20::approveCall {
            spender: self.spender,
            amount: U256::MAX,
        }
        .abi_encode();
        ActionRequest::call(self.token, calldata, APPROVE_GAS_LIMIT)
    }
}

/// Create an order adding liquidity to the PLP pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityOrder {
    /// The LiquidityHandler
    pub handler: Address,
    /// The token deposited
    pub token: Address,
    /// The amount deposited, in the token's units
    pub amount_in: U256,
    /// The minimum amount of PLP to receive
    pub min_out: U256,
    /// The fee paid to the order executor
    pub execution_fee: U256,
    /// Whether to wrap native ETH sent with the order
    pub should_wrap: bool,
}

/// Execute pending liquidity orders against a fresh price update
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteLiquidityOrder {
    /// The LiquidityHandler
    pub handler: Address,
    /// The index up to which orders are executed
    pub end_index: U256,
    /// The recipient of execution fees
    pub fee_receiver: Address,
    /// The prices to publish, in asset index order
    pub observations: Vec<PriceObservation>,
    /// The hash of the encoded Pyth VAAs, zero when none are attached
    pub encoded_vaas: B256,
}

/// Allow a vault strategy to call a target on behalf of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetStrategyAllowance {
    /// The VaultStorage
    pub vault_storage: Address,
    /// The token the strategy acts on
    pub token: Address,
    /// The strategy
    pub strategy: Address,
    /// The contract the strategy may call
    pub target: Address,
}

/// The code deployed by a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentKind {
    /// A plain contract
    Contract {
        /// The creation bytecode, including any constructor arguments
        init_code: Bytes,
    },
    /// An implementation behind a `TransparentUpgradeableProxy`
    UpgradeableProxy {
        /// The creation bytecode of the implementation
        implementation_code: Bytes,
        /// The creation bytecode of the proxy, without constructor arguments
        proxy_code: Bytes,
        /// The call made on the implementation when the proxy is constructed
        init_calldata: Bytes,
    },
}

/// Deploy a contract and record it under a logical name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// The address book category of the contract
    pub category: AddressCategory,
    /// The logical name of the contract
    pub name: String,
    /// The code to deploy
    pub kind: DeploymentKind,
}

impl Deployment {
    /// Deploy a plain contract
    pub fn contract(category: AddressCategory, name: &str, init_code: Bytes) -> Self {
        Self {
            category,
            name: name.to_string(),
            kind: DeploymentKind::Contract { init_code },
        }
    }

    /// Deploy an implementation behind a proxy initialized with `initialize()`
    pub fn initialized_proxy(
        category: AddressCategory,
        name: &str,
        implementation_code: Bytes,
        proxy_code: Bytes,
    ) -> Self {
        Self {
            category,
            name: name.to_string(),
            kind: DeploymentKind::UpgradeableProxy {
                implementation_code,
                proxy_code,
                init_calldata: IConfigStorage::initializeCall {}.abi_encode().into(),
            },
        }
    }

    /// The creation of the contract, or of the implementation behind the proxy
    pub fn creation_request(&self) -> ActionRequest {
        match &self.kind {
            DeploymentKind::Contract { init_code } => {
                ActionRequest::create(init_code.clone(), DEPLOY_GAS_LIMIT)
            }
            DeploymentKind::UpgradeableProxy {
                implementation_code,
                ..
            } => ActionRequest::create(implementation_code.clone(), DEPLOY_GAS_LIMIT),
        }
    }

    /// The creation of the proxy in front of a deployed implementation,
    /// `None` for plain contracts
    pub fn proxy_request(&self, implementation: Address, owner: Address) -> Option<ActionRequest> {
        match &self.kind {
            DeploymentKind::Contract { .. } => None,
            DeploymentKind::UpgradeableProxy {
                proxy_code,
                init_calldata,
                ..
            } => {
                let args = (implementation, owner, init_calldata.clone()).abi_encode_params();
                let init_code = [&proxy_code[..], args.as_slice()].concat();
                Some(ActionRequest::create(init_code, DEPLOY_GAS_LIMIT))
            }
        }
    }
}

/// An action against the protocol's contracts
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Create an add liquidity order
    CreateAddLiquidityOrder(AddLiquidityOrder),
    /// Execute pending liquidity orders
    ExecuteLiquidityOrder(ExecuteLiquidityOrder),
    /// Set a vault strategy allowance
    SetStrategyAllowance(SetStrategyAllowance),
    /// Deploy a contract
    Deploy(Deployment),
}

impl Action {
    /// The class of the action
    pub fn class(&self) -> ActionClass {
        match self {
            Action::CreateAddLiquidityOrder(_) | Action::ExecuteLiquidityOrder(_) => {
                ActionClass::Operational
            }
            Action::SetStrategyAllowance(_) => ActionClass::Privileged,
            Action::Deploy(_) => ActionClass::Deployment,
        }
    }

    /// The contract the action calls, `None` for deployments
    pub fn target(&self) -> Option<Address> {
        match self {
            Action::CreateAddLiquidityOrder(order) => Some(order.handler),
            Action::ExecuteLiquidityOrder(exec) => Some(exec.handler),
            Action::SetStrategyAllowance(allowance) => Some(allowance.vault_storage),
            Action::Deploy(_) => None,
        }
    }

    /// The allowance the action requires, if any
    pub fn precondition(&self) -> Option<AllowancePrecondition> {
        match self {
            Action::CreateAddLiquidityOrder(order) => Some(AllowancePrecondition {
                token: order.token,
                spender: order.handler,
                amount: order.amount_in,
            }),
            _ => None,
        }
    }

    /// The prices the action publishes, for price-sensitive actions
    pub fn observations(&self) -> Option<&[PriceObservation]> {
        match self {
            Action::ExecuteLiquidityOrder(exec) => Some(&exec.observations),
            _ => None,
        }
    }

    /// Encode the action as a request, using the payload built from its observations
    pub fn encode(&self, payload: Option<&PricePayload>) -> Result<ActionRequest, ScriptError> {
        match self {
            Action::CreateAddLiquidityOrder(order) => {
                let calldata = ILiquidityHandler::createAddLiquidityOrderCall {
                    tokenIn: order.token,
                    amountIn: order.amount_in,
                    minOut: order.min_out,
                    executionFee: order.execution_fee,
                    shouldWrap: order.should_wrap,
                }
                .abi_encode();
                Ok(ActionRequest::call(order.handler, calldata, CREATE_ORDER_GAS_LIMIT)
                    .with_execution_fee(order.execution_fee))
            }
            Action::ExecuteLiquidityOrder(exec) => {
                let payload = payload.ok_or_else(|| {
                    ScriptError::CalldataConstruction(
                        "order execution requires a price payload".to_string(),
                    )
                })?;
                let calldata = ILiquidityHandler::executeOrderCall {
                    endIndex: exec.end_index,
                    feeReceiver: exec.fee_receiver,
                    priceData: payload.packed_price_updates(),
                    publishTimeData: payload.packed_publish_time_diffs(),
                    minPublishTime: U256::from(payload.min_publish_time()),
                    encodedVaas: exec.encoded_vaas,
                }
                .abi_encode();
                Ok(ActionRequest::call(exec.handler, calldata, EXECUTE_ORDER_GAS_LIMIT))
            }
            Action::SetStrategyAllowance(allowance) => {
                let calldata = IVaultStorage::setStrategyAllowanceCall {
                    token: allowance.token,
                    strategy: allowance.strategy,
                    target: allowance.target,
                }
                .abi_encode();
                Ok(ActionRequest::call(
                    allowance.vault_storage,
                    calldata,
                    CONFIG_CALL_GAS_LIMIT,
                ))
            }
            Action::Deploy(deployment) => Ok(deployment.creation_request()),
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateAddLiquidityOrder(_) => write!(f, "create add liquidity order"),
            Action::ExecuteLiquidityOrder(_) => write!(f, "execute liquidity order"),
            Action::SetStrategyAllowance(_) => write!(f, "set strategy allowance"),
            Action::Deploy(deployment) => {
                write!(f, "deploy {}.{}", deployment.category, deployment.name)
            }
        }
    }
}
