use rand::Rng;

/// Random 64-bit id for a connection. Used for log correlation and for
/// deciding which socket owns a player slot.
pub fn rand_id() -> u64 {
    // Zero is never handed out so it can mean "no connection" in logs.
    rand::thread_rng().gen_range(1..=u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_ids_are_drawn_back_to_back_then_they_differ() {
        let a = rand_id();
        let b = rand_id();
        assert_ne!(a, b);
        assert_ne!(a, 0);
    }
}
