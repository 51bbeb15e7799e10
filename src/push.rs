use std::fmt;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Url;

use crate::{
    error::Error,
    provider::HTTP,
    types::{Claims, PushHeader, PushTarget},
};

/// Push services reject tokens valid for more than 24 hours.
const VAPID_TOKEN_LIFETIME: i64 = 12 * 60 * 60;

// PKCS#8 envelope of a P-256 key: algorithm identifiers, the SEC1
// ECPrivateKey header, and the tag introducing the public key.
const PKCS8_P256_PREFIX: [u8; 36] = [
    0x30, 0x81, 0x87, 0x02, 0x01, 0x00, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86,
    0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d,
    0x03, 0x01, 0x07, 0x04, 0x6d, 0x30, 0x6b, 0x02, 0x01, 0x01, 0x04, 0x20,
];
const PKCS8_P256_PUBLIC_KEY_TAG: [u8; 5] = [0xa1, 0x44, 0x03, 0x42, 0x00];

const PUBLIC_KEY_LENGTH: usize = 65;
const PRIVATE_KEY_LENGTH: usize = 32;

/// Delivers one encrypted payload to one subscription.
#[async_trait]
pub trait PushDelivery: Send + Sync + fmt::Debug {
    async fn deliver(
        &self,
        target: &PushTarget,
        payload: &[u8],
    ) -> Result<(), Error>;
}

#[derive(Clone)]
pub struct VapidKeys {
    public_key: String,
    private_der: Vec<u8>,
    subject: String,
}

impl fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key", &self.public_key)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl VapidKeys {
    /// Builds the signing key from the base64url forms printed by
    /// `gen-vapid`: the uncompressed public point and the raw private scalar.
    pub fn from_base64(
        public_key: &str,
        private_key: &str,
        subject: &str,
    ) -> Result<VapidKeys, Error> {
        let public = decode_base64url(public_key)?;
        let private = decode_base64url(private_key)?;

        if public.len() != PUBLIC_KEY_LENGTH || public[0] != 0x04 {
            return Err(Error::ConfigurationError(String::from(
                "VAPID public key must be an uncompressed P-256 point",
            )));
        }

        if private.len() != PRIVATE_KEY_LENGTH {
            return Err(Error::ConfigurationError(String::from(
                "VAPID private key must be 32 bytes",
            )));
        }

        let mut private_der = Vec::with_capacity(
            PKCS8_P256_PREFIX.len()
                + PRIVATE_KEY_LENGTH
                + PKCS8_P256_PUBLIC_KEY_TAG.len()
                + PUBLIC_KEY_LENGTH,
        );
        private_der.extend_from_slice(&PKCS8_P256_PREFIX);
        private_der.extend_from_slice(&private);
        private_der.extend_from_slice(&PKCS8_P256_PUBLIC_KEY_TAG);
        private_der.extend_from_slice(&public);

        Ok(VapidKeys {
            public_key: BASE64_URL.encode(&public),
            private_der,
            subject: subject.to_owned(),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn sign(&self, aud: String, exp: i64) -> Result<String, Error> {
        let key = EncodingKey::from_ec_der(&self.private_der);
        let claims = Claims {
            aud,
            sub: self.subject.to_owned(),
            exp,
        };
        let token = encode(&Header::new(Algorithm::ES256), &claims, &key)?;

        Ok(token)
    }
}

/// Web Push over HTTP: VAPID-signed, `aes128gcm` encrypted.
#[derive(Debug)]
pub struct WebPush {
    http: HTTP,
    vapid: VapidKeys,
    header: PushHeader,
}

impl WebPush {
    pub fn new(http: HTTP, vapid: VapidKeys, header: PushHeader) -> Self {
        WebPush {
            http,
            vapid,
            header,
        }
    }
}

#[async_trait]
impl PushDelivery for WebPush {
    async fn deliver(
        &self,
        target: &PushTarget,
        payload: &[u8],
    ) -> Result<(), Error> {
        let aud = audience(&target.endpoint)?;
        let exp = Utc::now().timestamp() + VAPID_TOKEN_LIFETIME;
        let token = self.vapid.sign(aud, exp)?;

        let p256dh = decode_base64url(&target.p256dh)?;
        let auth = decode_base64url(&target.auth)?;
        let data = ece::encrypt(&p256dh, &auth, payload)?;

        let status = self
            .http
            .post_push(
                &target.endpoint,
                &token,
                self.vapid.public_key(),
                &self.header,
                data,
            )
            .await?;

        if !(200..300).contains(&status) {
            return Err(Error::PushRejected { status });
        }

        Ok(())
    }
}

/// JWT audience: the origin of the push endpoint.
pub fn audience(endpoint: &str) -> Result<String, Error> {
    let url = Url::parse(endpoint)?;
    let origin = url.origin();

    if !origin.is_tuple() {
        return Err(Error::InvalidOption {
            option: String::from("host"),
        });
    }

    Ok(origin.ascii_serialization())
}

/// Accepts url-safe or standard alphabet, with or without padding.
pub fn decode_base64url(value: &str) -> Result<Vec<u8>, Error> {
    let normalized = value
        .trim()
        .trim_end_matches('=')
        .replace('+', "-")
        .replace('/', "_");

    Ok(BASE64_URL.decode(normalized)?)
}

/// Fresh VAPID pair as `(public, private)` base64url strings.
pub fn generate_vapid_keys() -> Result<(String, String), Error> {
    let (keypair, _) = ece::generate_keypair_and_auth_secret()?;
    let components = keypair.raw_components()?;

    let private = components.private_key();
    let mut scalar = vec![0u8; PRIVATE_KEY_LENGTH.saturating_sub(private.len())];
    scalar.extend_from_slice(private);

    Ok((
        BASE64_URL.encode(components.public_key()),
        BASE64_URL.encode(scalar),
    ))
}
