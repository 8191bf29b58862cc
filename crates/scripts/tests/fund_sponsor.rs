//! Funding a sponsor wallet against a local anvil node.

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    node_bindings::{Anvil, AnvilInstance},
    primitives::{address, bytes, Address, Bytes, U256},
    providers::{ext::AnvilApi, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use coins_bip32::{
    enc::{MainnetEncoder, XKeyEncoder},
    xkeys::{Parent, XPriv},
};
use qrng_scripts::{
    config::parse_amount,
    fund::{self, fund_sponsor, FundRequest},
    tx,
};

const HARDEN: u32 = 0x8000_0000;

/// Runtime code that reverts on every call: `PUSH1 0 PUSH1 0 REVERT`.
const REVERTING_CODE: Bytes = bytes!("60006000fd");

/// Base58 xpub of a throwaway airnode and the matching airnode address.
fn airnode_fixture() -> (String, Address) {
    let mut xpriv = XPriv::root_from_seed(&[42u8; 32], None).unwrap();
    for index in [44 | HARDEN, 60 | HARDEN, HARDEN] {
        xpriv = xpriv.derive_child(index).unwrap();
    }
    let xpub = xpriv.verify_key();

    let airnode = qrng_sponsor::airnode_address(&xpub).unwrap();
    (MainnetEncoder::xpub_to_base58(&xpub).unwrap(), airnode)
}

fn fund_request(requester: Address) -> FundRequest {
    let (airnode_xpub, airnode) = airnode_fixture();
    FundRequest {
        airnode,
        airnode_xpub,
        requester,
        amount: parse_amount("0.1").unwrap(),
        amount_display: "0.1".to_string(),
    }
}

fn anvil_provider() -> (AnvilInstance, impl Provider) {
    let anvil = Anvil::new().try_spawn().unwrap();
    let signer: PrivateKeySigner = anvil.keys()[0].clone().into();
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .on_http(anvil.endpoint().parse().unwrap());
    (anvil, provider)
}

#[tokio::test]
#[ignore = "requires an anvil binary on PATH"]
async fn funds_derived_sponsor_wallet_with_exact_amount() {
    qrng_tracing::test_tracing();
    let (_anvil, provider) = anvil_provider();

    let requester = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
    let request = fund_request(requester);

    let mut out = Vec::new();
    let funded = fund_sponsor(&provider, &request, 1, &mut out).await.unwrap();

    let expected =
        qrng_sponsor::derive_sponsor_wallet(&request.airnode_xpub, request.airnode, requester)
            .unwrap();
    assert_eq!(funded.sponsor_wallet, expected);
    assert!(funded.receipt.status());
    assert_eq!(funded.receipt.to, Some(expected));

    let balance = provider.get_balance(expected).await.unwrap();
    assert_eq!(balance, U256::from(100_000_000_000_000_000u64));

    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!(
            "Sponsor wallet address: {expected}\n\
             Funding sponsor wallet at {expected} with 0.1 ...\n\
             Sponsor wallet funded\n"
        )
    );
}

#[tokio::test]
#[ignore = "requires an anvil binary on PATH"]
async fn rejected_transfer_is_fatal_and_not_reported_as_funded() {
    qrng_tracing::test_tracing();
    let (_anvil, provider) = anvil_provider();

    let request = fund_request(address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"));
    let sponsor_wallet = qrng_sponsor::derive_sponsor_wallet(
        &request.airnode_xpub,
        request.airnode,
        request.requester,
    )
    .unwrap();
    provider.anvil_set_code(sponsor_wallet, REVERTING_CODE).await.unwrap();

    let mut out = Vec::new();
    let err = fund_sponsor(&provider, &request, 1, &mut out).await.unwrap_err();

    // Gas estimation runs the transfer, so the node refuses it before broadcast.
    assert!(matches!(err, fund::Error::Tx(tx::Error::Rpc(_))), "unexpected error: {err:?}");
    let out = String::from_utf8(out).unwrap();
    assert_eq!(out, format!("Sponsor wallet address: {sponsor_wallet}\n"));
    assert_eq!(provider.get_balance(sponsor_wallet).await.unwrap(), U256::ZERO);
}

#[tokio::test]
#[ignore = "requires an anvil binary on PATH"]
async fn reverted_transfer_is_tx_failed() {
    qrng_tracing::test_tracing();
    let (_anvil, provider) = anvil_provider();

    let target = address!("0x6fDf1e43519ec7D7B9a6788f735a267CDe00EA92");
    provider.anvil_set_code(target, REVERTING_CODE).await.unwrap();

    // An explicit gas limit skips estimation, so the transfer is mined and reverts.
    let transfer =
        fund::transfer_request(target, parse_amount("0.1").unwrap()).with_gas_limit(100_000);
    let pending = provider.send_transaction(transfer).await.unwrap();
    let tx_hash = *pending.tx_hash();

    match tx::confirm(pending, 1).await {
        Err(tx::Error::TxFailed { tx_hash: failed }) => assert_eq!(failed, tx_hash),
        other => panic!("expected TxFailed, got {other:?}"),
    }
    assert_eq!(provider.get_balance(target).await.unwrap(), U256::ZERO);
}
