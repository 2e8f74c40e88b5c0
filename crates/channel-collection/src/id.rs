//! Internal id allocation (§4.I).
//!
//! Three disjoint namespaces share one compact string representation:
//! detached stores get even numbers, attached stores with a numeric id from
//! the runtime get odd numbers, and attached stores with a uuid-shaped id
//! from the runtime keep that uuid verbatim.

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// An id handed out by the upstream runtime's id compressor when a store is
/// made visible in an attached container (§6).
#[derive(Debug, Clone)]
pub enum GeneratedId {
    Numeric(u64),
    Uuid(String),
}

/// Id for a store created while the container is detached: `2 * count`,
/// where `count` is the number of contexts that exist at allocation time.
pub fn detached_id(existing_context_count: usize) -> String {
    encode_base36(2 * existing_context_count as u64)
}

/// Id for a store made visible while the container is attached, derived
/// from whatever the runtime's id compressor handed back.
pub fn attached_id(generated: GeneratedId) -> String {
    match generated {
        GeneratedId::Numeric(n) => encode_base36(2 * n + 1),
        GeneratedId::Uuid(s) => s,
    }
}

fn encode_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).expect("alphabet is ascii")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detached_ids_are_even_and_compact() {
        assert_eq!(detached_id(0), "0");
        assert_eq!(detached_id(1), "2");
        assert_eq!(detached_id(18), "10"); // 2*18=36, base-36 "36" == "10"
    }

    #[test]
    fn attached_numeric_ids_are_odd() {
        // matches S2: first attached store gets id "1" (2*0+1).
        assert_eq!(attached_id(GeneratedId::Numeric(0)), "1");
        assert_eq!(attached_id(GeneratedId::Numeric(1)), "3");
    }

    #[test]
    fn attached_uuid_ids_pass_through() {
        assert_eq!(
            attached_id(GeneratedId::Uuid("d3b0-uuid".to_string())),
            "d3b0-uuid"
        );
    }
}
