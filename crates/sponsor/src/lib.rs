//! Sponsor wallet derivation for Airnode request-response protocol (RRP) sponsors.
//!
//! An Airnode publishes the extended public key of its `m/44'/60'/0'` node. The wallet that pays
//! for fulfilment transactions on behalf of a sponsor is a non-hardened descendant of that key,
//! so anyone holding the xpub can compute it.

use alloy::primitives::{Address, U256};
use coins_bip32::{
    enc::{MainnetEncoder, XKeyEncoder},
    xkeys::{Parent, XPub},
};
use k256::ecdsa::VerifyingKey;

/// Protocol id used by the request-response protocol.
pub const PROTOCOL_ID_RRP: u32 = 1;

/// Number of bits taken from the sponsor address per path segment. Keeps every index below the
/// hardened range.
const SEGMENT_BITS: usize = 31;

/// Number of segments needed to cover a 160 bit address.
const SEGMENT_COUNT: usize = 6;

/// Full length of a sponsor wallet path, including the protocol id.
pub const WALLET_PATH_LEN: usize = SEGMENT_COUNT + 1;

/// Errors from deriving a sponsor wallet.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// the extended public key could not be parsed or derived from
    #[error("invalid extended public key: {0}")]
    Xpub(#[from] coins_bip32::Bip32Error),
    /// the xpub is not the one belonging to the given airnode
    #[error("xpub does not belong to airnode {airnode} (xpub resolves to {derived})")]
    XpubMismatch {
        /// Airnode address that was expected.
        airnode: Address,
        /// Airnode address the xpub actually resolves to.
        derived: Address,
    },
}

/// Derivation path of the sponsor wallet, relative to the airnode xpub.
///
/// The first segment is the protocol id. The sponsor address, read as a big endian integer, is
/// split into six 31 bit segments with the least significant segment first.
pub fn wallet_path(sponsor: Address, protocol_id: u32) -> [u32; WALLET_PATH_LEN] {
    let sponsor = U256::from_be_slice(sponsor.as_slice());
    let mask = U256::from((1u64 << SEGMENT_BITS) - 1);

    let mut path = [protocol_id; WALLET_PATH_LEN];
    for (i, segment) in path.iter_mut().skip(1).enumerate() {
        *segment = ((sponsor >> (SEGMENT_BITS * i)) & mask).to::<u32>();
    }
    path
}

/// Derive the RRP sponsor wallet of `sponsor` for the airnode identified by `airnode` and
/// `airnode_xpub`.
pub fn derive_sponsor_wallet(
    airnode_xpub: &str,
    airnode: Address,
    sponsor: Address,
) -> Result<Address, Error> {
    derive_sponsor_wallet_for_protocol(airnode_xpub, airnode, sponsor, PROTOCOL_ID_RRP)
}

/// Same as [`derive_sponsor_wallet`] for an arbitrary protocol id.
pub fn derive_sponsor_wallet_for_protocol(
    airnode_xpub: &str,
    airnode: Address,
    sponsor: Address,
    protocol_id: u32,
) -> Result<Address, Error> {
    let xpub = MainnetEncoder::xpub_from_base58(airnode_xpub)?;

    let derived = airnode_address(&xpub)?;
    if derived != airnode {
        return Err(Error::XpubMismatch { airnode, derived });
    }

    let wallet = derive_path(&xpub, &wallet_path(sponsor, protocol_id))?;
    Ok(xpub_address(&wallet))
}

/// The airnode address is the `0/0` child of its xpub.
pub fn airnode_address(xpub: &XPub) -> Result<Address, Error> {
    derive_path(xpub, &[0, 0]).map(|child| xpub_address(&child))
}

fn derive_path(xpub: &XPub, path: &[u32]) -> Result<XPub, Error> {
    let mut node = xpub.clone();
    for index in path {
        node = node.derive_child(*index)?;
    }
    Ok(node)
}

fn xpub_address(xpub: &XPub) -> Address {
    let key = <XPub as AsRef<VerifyingKey>>::as_ref(xpub);
    let point = key.to_encoded_point(false);
    // Drop the 0x04 SEC1 tag, the address hashes the raw 64 byte key.
    Address::from_raw_public_key(&point.as_bytes()[1..])
}
