use chrono::{DateTime, Utc};
use rand::Rng;

use crate::models::access_request::{AccessOutcome, NewAccessRequest};
use crate::storage::{self, AccessRequestRegistry};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Details of an access request as submitted, before a reference id exists.
#[derive(Debug, Clone)]
pub struct AccessApplication {
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub company: Option<String>,
}

/// Dedup gate in front of manual review: the first request for an email is
/// stored and gets a reference id, repeats are acknowledged without a write.
pub async fn submit<R>(registry: &R, application: AccessApplication) -> storage::Result<AccessOutcome>
where
    R: AccessRequestRegistry + ?Sized,
{
    let reference_id = generate_reference_id();
    let request = NewAccessRequest {
        username: application.username,
        email: application.email,
        phone_number: application.phone_number,
        company: application.company,
        reference_id: reference_id.clone(),
    };

    let inserted = registry.register_access_request(&request).await?;
    if inserted {
        tracing::info!(email = %request.email, reference_id = %reference_id, "Access request recorded");
    } else {
        tracing::info!(email = %request.email, "Access request repeated for known email");
    }

    Ok(AccessOutcome {
        is_new_user: inserted,
        reference_id: inserted.then_some(reference_id),
    })
}

/// `SMS-<millis base36>-<6 random base36>`, uppercased. Good enough to quote
/// over the phone; carries no authority.
pub fn generate_reference_id() -> String {
    reference_id_at(Utc::now(), &mut rand::thread_rng())
}

fn reference_id_at<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let millis = now.timestamp_millis().max(0) as u64;
    let suffix: String = (0..6)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();

    format!("SMS-{}-{}", to_base36(millis), suffix).to_uppercase()
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    fn application(email: &str, phone: &str) -> AccessApplication {
        AccessApplication {
            username: "Ada Lovelace".into(),
            email: email.into(),
            phone_number: phone.into(),
            company: Some("Analytical Engines".into()),
        }
    }

    #[test]
    fn base36_matches_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn reference_id_shape() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let id = reference_id_at(now, &mut StdRng::seed_from_u64(7));

        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "SMS");
        assert_eq!(parts[1], "LOYW3V28");
        assert_eq!(parts[2].len(), 6);
        assert!(id
            .chars()
            .all(|c| c == '-' || c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn new_email_gets_reference_repeat_does_not() {
        let store = MemoryStorage::new();

        let first = submit(&store, application("ada@x.com", "+15550001")).await.unwrap();
        assert!(first.is_new_user);
        assert!(first.reference_id.as_deref().is_some_and(|r| !r.is_empty()));

        let again = submit(&store, application("ada@x.com", "+15550001")).await.unwrap();
        assert!(!again.is_new_user);
        assert_eq!(again.reference_id, None);
        assert_eq!(store.access_request_count().await, 1);
    }

    #[tokio::test]
    async fn phone_owned_by_other_email_conflicts() {
        let store = MemoryStorage::new();
        submit(&store, application("ada@x.com", "+15550001")).await.unwrap();

        let err = submit(&store, application("bob@x.com", "+15550001"))
            .await
            .unwrap_err();
        assert!(matches!(err, storage::StorageError::Conflict(_)));
    }
}
