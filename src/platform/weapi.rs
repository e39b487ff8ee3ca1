//! NetEase Cloud Music `weapi` request encryption.
//!
//! The web client sends every private API call as two form fields:
//!
//! ```text
//! params    = base64(AES-CBC(base64(AES-CBC(json, PRESET_KEY)), session_key))
//! encSecKey = RSA(reverse(session_key), e, n) as hex
//! ```
//!
//! The session key is normally random. Pinning it makes the RSA half a
//! constant, so `encSecKey` is precomputed and nothing here is random.
//! If NetEase ever rotates its RSA public key the constant goes stale and
//! every call will be rejected.

use aes::Aes128;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use serde::Serialize;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;

const PRESET_KEY: [u8; 16] = *b"0CoJUm6Qyw8W8jud";
const SESSION_KEY: [u8; 16] = *b"CLdj6QVhWOf3xWZc";
const IV: [u8; 16] = *b"0102030405060708";

/// RSA ciphertext of [`SESSION_KEY`] under the web client's public key.
const ENC_SEC_KEY: &str = "c779360e9b98223b6b810fee6926f522a2f1c5b608ce90827a09385628ac1c60fa1b7b99da92c68bacd29373d698f36c8352427edb4f85c314acf29bf2d42071f5038326b274a4364111f2b5dffdf5fd0cc27c0a0bf02a8d866353029b35d04c5740ad78b9fb43c06084cb825763caf1b26531c0d37028dbc1f0ce2bf83d0cd3";

/// Form fields for a `weapi` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeapiPayload {
    pub params: String,
    pub enc_sec_key: String,
}

impl WeapiPayload {
    /// Field pairs in the order the web client posts them.
    pub fn form(&self) -> [(&str, &str); 2] {
        [
            ("params", self.params.as_str()),
            ("encSecKey", self.enc_sec_key.as_str()),
        ]
    }
}

/// Encrypt `request` into a `weapi` payload.
pub fn encrypt<T: Serialize + ?Sized>(request: &T) -> Result<WeapiPayload, serde_json::Error> {
    let json = serde_json::to_string(request)?;
    let inner = aes_cbc_base64(json.as_bytes(), &PRESET_KEY);
    let params = aes_cbc_base64(inner.as_bytes(), &SESSION_KEY);

    Ok(WeapiPayload {
        params,
        enc_sec_key: ENC_SEC_KEY.to_string(),
    })
}

fn aes_cbc_base64(plain: &[u8], key: &[u8; 16]) -> String {
    let cipher = Aes128CbcEnc::new(key.into(), &IV.into());
    STANDARD.encode(cipher.encrypt_padded_vec_mut::<Pkcs7>(plain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_round_matches_known_vector() {
        assert_eq!(aes_cbc_base64(b"hello", &PRESET_KEY), "+J9Q3vLzLGFuqlWFQh3T3A==");
    }

    #[test]
    fn song_detail_request_matches_known_vector() {
        let payload = encrypt(&serde_json::json!({
            "br": 128000,
            "csrf_token": "",
            "ids": "[33599431]",
        }))
        .unwrap();
        assert_eq!(
            payload.params,
            "fXbzj6flMMER85j56mbs59XrZioeYMRT+VxqiVW1wOCt9yiHY1jBsErlWiRcg8/TWbc7U6bIOJL+pN5oLMqvbLW8Nww1Qmr1+T6OjeUHygMNZN5YnOeycFXbQWwVGmR2"
        );
        assert_eq!(payload.enc_sec_key, ENC_SEC_KEY);
    }

    #[test]
    fn encrypt_is_deterministic() {
        let request = serde_json::json!({"a": 1});
        let first = encrypt(&request).unwrap();
        let second = encrypt(&request).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.params, "YqZNutLy4BAzSQ6xanwkHa8Gozejks3vaaqfLh15Cz0=");
    }

    #[test]
    fn form_uses_upstream_field_names() {
        let payload = encrypt(&serde_json::json!({"a": 1})).unwrap();
        let form = payload.form();
        assert_eq!(form[0].0, "params");
        assert_eq!(form[1].0, "encSecKey");
        assert_eq!(form[1].1, ENC_SEC_KEY);
    }
}
