//! Fixed JIP-5 vectors exercised only through the public API: a known
//! Ed25519 public key's alternative name, and the secret seed/public key
//! pair derived from the trivial seed for validator index 0.

use jam_pvm_core::{alternative_name, derive_secret_seeds, display_form, ed25519_signing_key, trivial_seed};

fn hex_decode_32(s: &str) -> [u8; 32] {
    hex::decode(s).unwrap().try_into().unwrap()
}

#[test]
fn alternative_name_matches_the_known_vector() {
    let public_key = hex_decode_32("4418fb8c85bb3985394a8c2756d3643457ce614546202a2f50b093d762499ace");

    let name = alternative_name(&public_key).unwrap();

    assert_eq!(name, "ebtu2jfrnpe5qkaxsuicgivq44vzumtjvmj4mji4ykon3qwgpwgce");
    assert_eq!(
        display_form(&name),
        "$ebtu2jfrnpe5qkaxsuicgivq44vzumtjvmj4mji4ykon3qwgpwgce"
    );
}

#[test]
fn jip5_seed_derivation_matches_the_known_vector() {
    let seed = trivial_seed(0).unwrap();
    assert_eq!(seed, [0u8; 32]);

    let seeds = derive_secret_seeds(&seed).unwrap();
    assert_eq!(
        seeds.ed25519_secret_seed,
        hex_decode_32("996542becdf1e78278dc795679c825faca2e9ed2bf101bf3c4a236d3ed79cf59")
    );

    let signing_key = ed25519_signing_key(&seeds.ed25519_secret_seed);
    let public_key = signing_key.verifying_key().to_bytes();

    assert_eq!(
        public_key,
        hex_decode_32("4418fb8c85bb3985394a8c2756d3643457ce614546202a2f50b093d762499ace")
    );
}
