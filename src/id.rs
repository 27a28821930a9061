use chrono::Utc;
use rand::Rng;

/// Produce a fresh message identifier: a random component followed by the
/// current time in milliseconds, both in base 36.
///
/// Uniqueness is best-effort only.
pub fn generate_message_id() -> String {
    let random: u64 = rand::thread_rng().gen();
    let millis = Utc::now().timestamp_millis().max(0) as u64;

    let mut id = to_base36(random);
    id.push_str(&to_base36(millis));
    id
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    // Only ASCII digits were pushed.
    String::from_utf8(buf).unwrap_or_default()
}
