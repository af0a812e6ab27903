//! Integration-Tests: Schluesselvereinbarung -> Cache -> Umschlag

use fluester_core::{ConversationId, UserId};
use fluester_crypto::{
    decrypt_from_wire, derive_from_shared_secret, encrypt_to_wire, generate_key_pair,
    parse_public_hex, CryptoError, DomainParameters, InMemorySecretStore, JsonFileSecretStore,
    SessionKeyCache,
};

struct Endpunkt {
    cache: SessionKeyCache,
}

#[test]
fn zwei_endpunkte_tauschen_nachrichten() {
    let params = DomainParameters::klein();
    let (alice_id, bob_id) = (UserId::new(), UserId::new());
    let conv = ConversationId::zwischen(alice_id, bob_id);

    let alice = Endpunkt { cache: SessionKeyCache::neu(InMemorySecretStore::neu()) };
    let bob = Endpunkt { cache: SessionKeyCache::neu(InMemorySecretStore::neu()) };

    let mut alice_paar = generate_key_pair(&params).expect("Schluesselpaar Alice");
    let mut bob_paar = generate_key_pair(&params).expect("Schluesselpaar Bob");

    // Oeffentliche Werte wandern als Hex ueber den Nachrichtenkanal
    let alice_pub_wire = alice_paar.public_hex();
    let bob_pub_wire = bob_paar.public_hex();

    let alice_key = alice
        .cache
        .schluessel_fuer(&conv, || {
            let peer = parse_public_hex(&bob_pub_wire)?;
            let secret = alice_paar.compute_shared_secret(&peer, &params)?;
            Ok(derive_from_shared_secret(&secret, &params))
        })
        .expect("Alice leitet ab");

    let bob_key = bob
        .cache
        .schluessel_fuer(&ConversationId::zwischen(bob_id, alice_id), || {
            let peer = parse_public_hex(&alice_pub_wire)?;
            let secret = bob_paar.compute_shared_secret(&peer, &params)?;
            Ok(derive_from_shared_secret(&secret, &params))
        })
        .expect("Bob leitet ab");

    assert_eq!(alice_key, bob_key);

    let wire = encrypt_to_wire("Treffen um acht?", &alice_key).unwrap();
    assert!(!wire.contains("Treffen"));
    assert_eq!(decrypt_from_wire(&wire, &bob_key).unwrap(), "Treffen um acht?");

    let antwort = encrypt_to_wire("Passt!", &bob_key).unwrap();
    assert_eq!(decrypt_from_wire(&antwort, &alice_key).unwrap(), "Passt!");
}

#[test]
fn manipulierte_nachricht_wird_nie_angezeigt() {
    let cache = SessionKeyCache::neu(InMemorySecretStore::neu());
    let conv = ConversationId::zwischen(UserId::new(), UserId::new());
    let key = cache
        .schluessel_fuer(&conv, || fluester_crypto::derive_from_tokens("a-token", "b-token"))
        .unwrap();

    let wire = encrypt_to_wire("Kontostand: 100", &key).unwrap();
    let mut wert: serde_json::Value = serde_json::from_str(&wire).unwrap();
    let ct = wert["ciphertext"].as_str().unwrap().to_string();
    // erstes Base64-Zeichen austauschen
    let ersatz = if ct.starts_with('A') { "B" } else { "A" };
    wert["ciphertext"] = serde_json::Value::String(format!("{ersatz}{}", &ct[1..]));

    let result = decrypt_from_wire(&wert.to_string(), &key);
    assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
}

#[test]
fn schluessel_ueberlebt_neustart_mit_datei_store() {
    let dir = tempfile::tempdir().unwrap();
    let pfad = dir.path().join("keys.json");
    let conv = ConversationId::zwischen(UserId::new(), UserId::new());

    let wire = {
        let cache = SessionKeyCache::neu(JsonFileSecretStore::oeffnen(&pfad).unwrap());
        let key = cache
            .schluessel_fuer(&conv, || fluester_crypto::derive_from_tokens("t1", "t2"))
            .unwrap();
        encrypt_to_wire("nach dem Neustart lesbar", &key).unwrap()
    };

    let cache = SessionKeyCache::neu(JsonFileSecretStore::oeffnen(&pfad).unwrap());
    let key = cache
        .gespeichert(&conv)
        .unwrap()
        .expect("Schluessel muss persistiert sein");
    assert_eq!(decrypt_from_wire(&wire, &key).unwrap(), "nach dem Neustart lesbar");
}
