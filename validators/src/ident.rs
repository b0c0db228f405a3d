use chrono::Utc;
use rand::Rng;

/// Build a disposable identifier of the form `<prefix>_<epoch-millis>_<nnnn>`.
///
/// The four-digit suffix is drawn from `1000..=9999`. Two calls within the same
/// millisecond collide with probability 1/9000, and nothing checks for it, so
/// this is only fit for throwaway test data. Callers needing real uniqueness
/// must use something else.
pub fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("{prefix}_{millis}_{suffix}")
}
