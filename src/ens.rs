//! ENS name resolution on top of plain `eth_call`s.

use crate::{constants::ENS_REGISTRY, error::GatewayResult};
use alloy::{
    primitives::{Address, B256, keccak256},
    providers::Provider,
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall,
    transports::TransportErrorKind,
};
use tracing::{instrument, trace};

sol! {
    #[derive(Debug)]
    interface IEnsRegistry {
        function resolver(bytes32 node) external view returns (address);
    }

    #[derive(Debug)]
    interface IEnsResolver {
        function addr(bytes32 node) external view returns (address);
    }
}

/// Computes the ENS namehash of a name.
///
/// See <https://docs.ens.domains/resolution/names#namehash>
pub fn namehash(name: &str) -> B256 {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    if name.is_empty() {
        return B256::ZERO;
    }

    name.rsplit('.').fold(B256::ZERO, |node, label| {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(keccak256(label.as_bytes()).as_slice());
        keccak256(buf)
    })
}

/// Resolves an ENS name to an address.
///
/// Returns `Ok(None)` if the name has no resolver or the resolver has no address for it.
#[instrument(skip(provider))]
pub async fn resolve<P: Provider>(provider: &P, name: &str) -> GatewayResult<Option<Address>> {
    let node = namehash(name);

    let resolver = provider
        .call(
            TransactionRequest::default()
                .to(ENS_REGISTRY)
                .input(IEnsRegistry::resolverCall { node }.abi_encode().into()),
        )
        .await
        .and_then(|ret| {
            IEnsRegistry::resolverCall::abi_decode_returns(&ret).map_err(TransportErrorKind::custom)
        })?;

    if resolver.is_zero() {
        trace!("No resolver for name");
        return Ok(None);
    }

    let address = provider
        .call(
            TransactionRequest::default()
                .to(resolver)
                .input(IEnsResolver::addrCall { node }.abi_encode().into()),
        )
        .await
        .and_then(|ret| {
            IEnsResolver::addrCall::abi_decode_returns(&ret).map_err(TransportErrorKind::custom)
        })?;

    Ok((!address.is_zero()).then_some(address))
}
