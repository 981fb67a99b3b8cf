use crate::{Database, TokenCipher};

fn test_db() -> Database {
    Database::open_in_memory().expect("Failed to create test DB")
}

fn test_cipher() -> TokenCipher {
    TokenCipher::from_key(&TokenCipher::generate_key()).expect("Failed to create cipher")
}

mod events;
