use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HmacSHA256 签名（钉钉、飞书机器人加签）
///
/// 算法：URLEncode(Base64(HmacSHA256(secret, string_to_sign)))
pub fn sign(secret: &str, string_to_sign: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(string_to_sign.as_bytes());
    let signature = B64.encode(mac.finalize().into_bytes());
    urlencoding::encode(&signature).into_owned()
}
