// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from Solana RPC client errors to [`MeterError`].

use solana_rpc_client_api::client_error::{Error as ClientError, ErrorKind};
use solana_rpc_client_api::request::RpcError;

use meterline_core::MeterError;

/// Classify a client error raised while talking to the cluster.
///
/// Errors the node returned about the request or transaction are
/// `Submission`. Transport, decoding, and anything else is `Network`.
pub fn map_client_error(context: &str, err: ClientError) -> MeterError {
    let rejection = match err.kind() {
        ErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
            Some(format!("{context}: rpc error {code}: {message}"))
        }
        ErrorKind::TransactionError(tx_err) => Some(format!("{context}: {tx_err}")),
        _ => None,
    };

    match rejection {
        Some(message) => MeterError::Submission { message },
        None => MeterError::Network {
            message: format!("{context}: {err}"),
            source: Some(Box::new(err)),
        },
    }
}
