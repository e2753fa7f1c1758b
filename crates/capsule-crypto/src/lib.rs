/// Capsule content cipher.
///
/// One shared symmetric key (AES-256-GCM) encrypts every capsule body on the
/// client before it is stored. The server only ever holds the encoded
/// ciphertext. There is no key rotation; losing the key loses the capsules.

pub mod encrypt;
pub mod keys;

pub use encrypt::{decrypt_content, encrypt_content};
pub use keys::ContentKey;
