use std::io;

use anyhow::anyhow;
use rocket::{
    data::{ByteUnit, FromData, Outcome},
    http::Status,
    Data, Request,
};
use tracing::trace;

const X_HUB_SIGNATURE_256: &str = "X-Hub-Signature-256";

/// Secret the GitHub hooks were created with. Without one, deliveries are accepted unsigned.
pub struct WebhookSecret(pub Option<String>);

fn validate_signature(secret: &str, signature: &str, data: &str) -> bool {
    trace!("validating signature...");
    use hmac::{Hmac, Mac, NewMac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        trace!("couldn't use the configured secret as HMAC key");
        return false;
    };

    mac.update(data.as_bytes());

    // GitHub puts a prefix in front of its hex SHA256
    let signature = match signature.strip_prefix("sha256=") {
        Some(s) => s,
        None => {
            trace!("couldn't strip prefix from signature `{}`", signature);
            return false;
        }
    };

    match hex::decode(signature) {
        Ok(bytes) => mac.verify(&bytes).is_ok(),
        Err(_) => {
            trace!("couldn't decode hex-encoded signature {}", signature);
            false
        }
    }
}

/// Raw body of a GitHub delivery, checked against its signature when a secret is configured.
pub struct GitHubPayload(pub String);

const LIMIT: ByteUnit = ByteUnit::Mebibyte(1);

#[rocket::async_trait]
impl<'r> FromData<'r> for GitHubPayload {
    type Error = anyhow::Error;

    async fn from_data(request: &'r Request<'_>, data: Data<'r>) -> Outcome<'r, Self> {
        trace!("received payload on GitHub webhook endpoint: {:?}", request);

        let secret = request
            .rocket()
            .state::<WebhookSecret>()
            .and_then(|secret| secret.0.as_deref());

        let signatures = request
            .headers()
            .get(X_HUB_SIGNATURE_256)
            .collect::<Vec<_>>();
        if secret.is_some() && signatures.len() != 1 {
            trace!("couldn't locate {} header", X_HUB_SIGNATURE_256);
            return Outcome::Error((
                Status::BadRequest,
                anyhow!("request header needs exactly one signature"),
            ));
        }

        let size_limit = request.limits().get("json").unwrap_or(LIMIT);
        let content = match data.open(size_limit).into_string().await {
            Ok(s) if s.is_complete() => s.into_inner(),
            Ok(_) => {
                let eof = io::ErrorKind::UnexpectedEof;
                trace!("payload was too big");
                return Outcome::Error((
                    Status::PayloadTooLarge,
                    io::Error::new(eof, "data limit exceeded").into(),
                ));
            }
            Err(e) => return Outcome::Error((Status::BadRequest, e.into())),
        };

        if let Some(secret) = secret {
            if !validate_signature(secret, signatures[0], &content) {
                trace!("signature validation failed, stopping here...");
                return Outcome::Error((Status::BadRequest, anyhow!("couldn't verify signature")));
            }
            trace!("validated GitHub payload");
        }

        Outcome::Success(GitHubPayload(content))
    }
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, data: &str) -> String {
    use hmac::{Hmac, Mac, NewMac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(data.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
