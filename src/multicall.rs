use anyhow::Result;
use ethers::abi::{Function, Param, ParamType, StateMutability, Token};
use ethers::prelude::*;
use log::debug;
use std::sync::Arc;

/// A single read call to be batched in a multicall.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    pub target: Address,
    pub call_data: Bytes,
}

/// Multicall3 `aggregate3` batch executor.
///
/// Every call is sent with `allowFailure = true`; failed calls come back as
/// `None` at their original position instead of failing the whole batch.
#[derive(Clone)]
pub struct Multicall<M: Middleware> {
    provider: Arc<M>,
    multicall_address: Address,
    batch_size: usize,
}

impl<M: Middleware + 'static> Multicall<M> {
    pub fn new(provider: Arc<M>, multicall_address: Address, batch_size: usize) -> Self {
        // Providers reject very large eth_call payloads
        let batch_size = batch_size.clamp(1, 500);
        Self {
            provider,
            multicall_address,
            batch_size,
        }
    }

    pub async fn run(&self, calls: Vec<Call>) -> Result<Vec<Option<Bytes>>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        // Coalesce identical calls to reduce load
        let mut unique_calls = indexmap::IndexSet::new();
        let mut original_indices = Vec::with_capacity(calls.len());
        for call in &calls {
            let (index, _) = unique_calls.insert_full(call.clone());
            original_indices.push(index);
        }
        let unique_calls: Vec<Call> = unique_calls.into_iter().collect();
        debug!(
            "Multicall coalesced {} calls into {}",
            calls.len(),
            unique_calls.len()
        );

        let mut unique_results: Vec<Option<Bytes>> = Vec::with_capacity(unique_calls.len());
        for chunk in unique_calls.chunks(self.batch_size) {
            unique_results.extend(self.execute_aggregate3(chunk).await?);
        }

        Ok(original_indices
            .into_iter()
            .map(|index| unique_results.get(index).cloned().flatten())
            .collect())
    }

    async fn execute_aggregate3(&self, calls: &[Call]) -> Result<Vec<Option<Bytes>>> {
        // aggregate3((address target, bool allowFailure, bytes callData)[])
        //   returns ((bool success, bytes returnData)[])
        let call_tokens: Vec<Token> = calls
            .iter()
            .map(|call| {
                Token::Tuple(vec![
                    Token::Address(call.target),
                    Token::Bool(true),
                    Token::Bytes(call.call_data.to_vec()),
                ])
            })
            .collect();

        let result_type = ParamType::Array(Box::new(ParamType::Tuple(vec![
            ParamType::Bool,
            ParamType::Bytes,
        ])));

        #[allow(deprecated)]
        let function = Function {
            name: "aggregate3".to_string(),
            inputs: vec![Param {
                name: "calls".to_string(),
                kind: ParamType::Array(Box::new(ParamType::Tuple(vec![
                    ParamType::Address,
                    ParamType::Bool,
                    ParamType::Bytes,
                ]))),
                internal_type: None,
            }],
            outputs: vec![Param {
                name: "returnData".to_string(),
                kind: result_type.clone(),
                internal_type: None,
            }],
            constant: None,
            state_mutability: StateMutability::Payable,
        };

        let calldata = function.encode_input(&[Token::Array(call_tokens)])?;
        let tx: ethers::types::transaction::eip2718::TypedTransaction = TransactionRequest::new()
            .to(self.multicall_address)
            .data(calldata)
            .into();
        let response = self
            .provider
            .call(&tx, None)
            .await
            .map_err(|e| anyhow::anyhow!("multicall eth_call failed: {}", e))?;

        let decoded = ethers::abi::decode(&[result_type], &response)?;
        let results = decoded
            .into_iter()
            .next()
            .and_then(|t| t.into_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid multicall response format"))?;

        Ok(results
            .into_iter()
            .map(|token| match token {
                Token::Tuple(mut tuple) if tuple.len() == 2 => {
                    let data = tuple.pop();
                    let success = tuple.pop();
                    match (success, data) {
                        (Some(Token::Bool(true)), Some(Token::Bytes(data))) => Some(Bytes::from(data)),
                        _ => None,
                    }
                }
                _ => None,
            })
            .collect())
    }
}
