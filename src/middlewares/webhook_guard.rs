use crate::config::{AppConfig, CieloConfig};
use crate::error::{AppError, AppResult};
use crate::utils::SlidingWindowLimiter;
use crate::utils::ip::{is_loopback, network_contains, parse_network, resolve_client_ip};
use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use ipnetwork::IpNetwork;
use sha2::Sha256;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADERS: [&str; 2] = ["x-cielo-signature", "cielo-signature"];
pub const WEBHOOK_RATE_LIMIT: usize = 100;
pub const WEBHOOK_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Hex HMAC-SHA256 of `body`.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of the received signature against the expected
/// one. An optional `sha256=` prefix is accepted.
pub fn verify_signature(secret: &str, body: &[u8], received: &str) -> bool {
    let received = received.trim();
    let received = received.strip_prefix("sha256=").unwrap_or(received);
    let expected = compute_signature(secret, body);
    if expected.is_empty() || received.len() != expected.len() {
        return false;
    }
    expected
        .as_bytes()
        .ct_eq(received.to_ascii_lowercase().as_bytes())
        .into()
}

/// Checks applied to every inbound gateway notification before its body is
/// trusted: rate limit, source IP, user agent (warn only) and signature.
#[derive(Clone)]
pub struct WebhookGate {
    allowed_networks: Arc<Vec<IpNetwork>>,
    allow_localhost: bool,
    trust_proxy: bool,
    secret: Option<String>,
    limiter: Arc<SlidingWindowLimiter>,
}

impl WebhookGate {
    pub fn new(cielo: &CieloConfig, app: &AppConfig) -> Self {
        let allowed_networks = cielo
            .webhook_allowed_ips
            .iter()
            .filter_map(|raw| match parse_network(raw) {
                Ok(net) => Some(net),
                Err(e) => {
                    log::error!("Ignoring invalid webhook allow-list entry {raw}: {e}");
                    None
                }
            })
            .collect();

        let secret = cielo.webhook_secret.clone().filter(|s| !s.is_empty());
        if secret.is_none() {
            log::warn!("CIELO_WEBHOOK_SECRET not set, webhook signatures will not be verified");
        }

        Self {
            allowed_networks: Arc::new(allowed_networks),
            allow_localhost: !app.is_production(),
            trust_proxy: app.trust_proxy,
            secret,
            limiter: Arc::new(SlidingWindowLimiter::new(
                WEBHOOK_RATE_LIMIT,
                WEBHOOK_RATE_WINDOW,
            )),
        }
    }

    pub fn with_limiter(mut self, limiter: SlidingWindowLimiter) -> Self {
        self.limiter = Arc::new(limiter);
        self
    }

    pub fn client_ip(&self, req: &HttpRequest) -> Option<IpAddr> {
        let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
        resolve_client_ip(
            header("x-forwarded-for"),
            header("x-real-ip"),
            req.peer_addr().map(|addr| addr.ip()),
            self.trust_proxy,
        )
    }

    pub fn is_allowed_ip(&self, ip: &IpAddr) -> bool {
        if self.allow_localhost && is_loopback(ip) {
            return true;
        }
        self.allowed_networks.iter().any(|net| network_contains(net, ip))
    }

    pub fn verify(&self, req: &HttpRequest, body: &[u8], correlation_id: &str) -> AppResult<()> {
        let ip = self.client_ip(req);
        let ip_key = ip.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string());

        if !self.limiter.check(&ip_key) {
            log::warn!("[{correlation_id}] Webhook rate limit exceeded for {ip_key}");
            return Err(AppError::TooManyRequests);
        }

        match ip {
            Some(ip) if self.is_allowed_ip(&ip) => {}
            _ => {
                log::warn!("[{correlation_id}] Webhook rejected from unauthorized IP {ip_key}");
                return Err(AppError::Forbidden(format!("IP {ip_key} not allowed")));
            }
        }

        let user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !user_agent.to_ascii_lowercase().contains("cielo") {
            log::warn!("[{correlation_id}] Webhook from {ip_key} with unexpected user agent {user_agent:?}");
        }

        let Some(secret) = &self.secret else {
            log::warn!("[{correlation_id}] Webhook signature not verified: no secret configured");
            return Ok(());
        };

        let Some(signature) = SIGNATURE_HEADERS
            .iter()
            .find_map(|h| req.headers().get(*h))
            .and_then(|v| v.to_str().ok())
        else {
            log::warn!("[{correlation_id}] Webhook from {ip_key} without signature header");
            return Err(AppError::Unauthorized("Missing webhook signature".to_string()));
        };

        if !verify_signature(secret, body, signature) {
            log::warn!("[{correlation_id}] Webhook from {ip_key} with invalid signature");
            return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
        }

        log::info!("[{correlation_id}] Webhook from {ip_key} passed security checks");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"PaymentId":"abc","ChangeType":1}"#;

    fn gate(secret: Option<&str>, production: bool) -> WebhookGate {
        let cielo = CieloConfig {
            merchant_id: String::new(),
            merchant_key: String::new(),
            api_url: String::new(),
            query_url: String::new(),
            webhook_secret: secret.map(str::to_string),
            webhook_allowed_ips: vec!["209.134.48.0/24".to_string(), "bogus".to_string()],
            soft_descriptor: String::new(),
            timeout_secs: 5,
        };
        let app = AppConfig {
            environment: if production { "production" } else { "development" }.to_string(),
            public_url: String::new(),
            trust_proxy: true,
        };
        WebhookGate::new(&cielo, &app)
    }

    #[test]
    fn test_signature_accepts_exact_match() {
        let sig = compute_signature(SECRET, BODY);
        assert_eq!(sig.len(), 64);
        assert!(verify_signature(SECRET, BODY, &sig));
        assert!(verify_signature(SECRET, BODY, &format!("sha256={sig}")));
        assert!(verify_signature(SECRET, BODY, &sig.to_uppercase()));
    }

    #[test]
    fn test_signature_rejects_flipped_byte() {
        let mut sig = compute_signature(SECRET, BODY).into_bytes();
        sig[10] = if sig[10] == b'0' { b'1' } else { b'0' };
        let sig = String::from_utf8(sig).unwrap();
        assert!(!verify_signature(SECRET, BODY, &sig));

        let mut body = BODY.to_vec();
        body[3] ^= 0x01;
        assert!(!verify_signature(
            SECRET,
            &body,
            &compute_signature(SECRET, BODY)
        ));
    }

    #[test]
    fn test_signature_rejects_length_mismatch() {
        let sig = compute_signature(SECRET, BODY);
        assert!(!verify_signature(SECRET, BODY, &sig[..63]));
        assert!(!verify_signature(SECRET, BODY, &format!("{sig}0")));
        assert!(!verify_signature(SECRET, BODY, ""));
    }

    #[test]
    fn test_allow_list_and_localhost() {
        let dev = gate(None, false);
        assert!(dev.is_allowed_ip(&"209.134.48.77".parse().unwrap()));
        assert!(dev.is_allowed_ip(&"127.0.0.1".parse().unwrap()));
        assert!(!dev.is_allowed_ip(&"8.8.8.8".parse().unwrap()));

        let prod = gate(None, true);
        assert!(!prod.is_allowed_ip(&"127.0.0.1".parse().unwrap()));
        assert!(prod.is_allowed_ip(&"::ffff:209.134.48.77".parse().unwrap()));
    }

    #[test]
    fn test_verify_rejects_unknown_ip() {
        let req = TestRequest::post()
            .insert_header(("x-forwarded-for", "8.8.8.8, 10.0.0.1"))
            .to_http_request();
        let err = gate(None, true).verify(&req, BODY, "t").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_verify_requires_signature_when_secret_set() {
        let req = TestRequest::post()
            .insert_header(("x-forwarded-for", "209.134.48.5"))
            .to_http_request();
        let err = gate(Some(SECRET), true).verify(&req, BODY, "t").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let req = TestRequest::post()
            .insert_header(("x-forwarded-for", "209.134.48.5"))
            .insert_header(("cielo-signature", compute_signature(SECRET, BODY)))
            .to_http_request();
        assert!(gate(Some(SECRET), true).verify(&req, BODY, "t").is_ok());
    }

    #[test]
    fn test_verify_rate_limits_per_ip() {
        let gate = gate(None, false).with_limiter(
            SlidingWindowLimiter::new(2, Duration::from_secs(60)).with_sweep_probability(0.0),
        );
        let req = TestRequest::post()
            .insert_header(("x-forwarded-for", "209.134.48.9"))
            .to_http_request();
        assert!(gate.verify(&req, BODY, "t").is_ok());
        assert!(gate.verify(&req, BODY, "t").is_ok());
        assert!(matches!(
            gate.verify(&req, BODY, "t"),
            Err(AppError::TooManyRequests)
        ));
    }
}
