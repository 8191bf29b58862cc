//! This module contains bindings for the QRNG requester contract.
//!
//! The JSON ABI in `json/` is the interface of the deployed requester and is treated as fixed.

#![allow(missing_docs)]

/// `QrngRequester.sol` bindings
pub mod qrng_requester {
    alloy::sol! {
      #[sol(rpc)]
      QrngRequester,
      "json/QrngRequester.json"
    }
}
