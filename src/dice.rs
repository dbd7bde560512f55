use std::fmt;

use rand::Rng;

/// Upper bound on dice per roll, keeps the reply within one message.
pub const MAX_ROLLS: u32 = 100;

#[derive(Debug, PartialEq)]
pub enum RollRequest {
    Roll { rolls: u32, limit: u32 },
    /// Zero or negative counts, silently ignored.
    Ignored,
    TooMany,
    BadFormat,
}

/// Parses `NdM`.
pub fn parse(notation: &str) -> RollRequest {
    let Some((rolls, limit)) = notation.trim().split_once(|c: char| c == 'd' || c == 'D') else {
        return RollRequest::BadFormat;
    };

    let (Ok(rolls), Ok(limit)) = (rolls.parse::<i64>(), limit.parse::<i64>()) else {
        return RollRequest::BadFormat;
    };

    if rolls < 1 || limit < 1 {
        return RollRequest::Ignored;
    }

    match (u32::try_from(rolls), u32::try_from(limit)) {
        (Ok(rolls), Ok(limit)) if rolls <= MAX_ROLLS => RollRequest::Roll { rolls, limit },
        (_, Err(_)) => RollRequest::BadFormat,
        _ => RollRequest::TooMany,
    }
}

#[derive(Debug, PartialEq)]
pub struct Roll {
    pub values: Vec<u32>,
}

impl Roll {
    pub fn total(&self) -> u64 {
        self.values.iter().map(|&value| u64::from(value)).sum()
    }
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.values.iter().map(u32::to_string).collect();
        write!(f, "{}", values.join(" + "))?;

        if self.values.len() > 1 {
            write!(f, " = {}", self.total())?;
        }

        Ok(())
    }
}

pub fn roll<R: Rng + ?Sized>(rolls: u32, limit: u32, rng: &mut R) -> Roll {
    Roll {
        values: (0..rolls).map(|_| rng.gen_range(1..=limit)).collect(),
    }
}

pub fn flip<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    if rng.gen_bool(0.5) {
        "Heads"
    } else {
        "Tails"
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn parses_dice_notation() {
        assert_eq!(parse("3d6"), RollRequest::Roll { rolls: 3, limit: 6 });
        assert_eq!(parse(" 1D20 "), RollRequest::Roll { rolls: 1, limit: 20 });
        assert_eq!(parse("0d6"), RollRequest::Ignored);
        assert_eq!(parse("2d-1"), RollRequest::Ignored);
        assert_eq!(parse("101d6"), RollRequest::TooMany);
        assert_eq!(parse("d6"), RollRequest::BadFormat);
        assert_eq!(parse("two d six"), RollRequest::BadFormat);
        assert_eq!(parse("36"), RollRequest::BadFormat);
    }

    #[test]
    fn rolls_stay_in_range_and_sum_up() {
        let mut rng = StdRng::seed_from_u64(42);

        for rolls in 1..=12 {
            for limit in [1, 2, 6, 20, 100] {
                let roll = roll(rolls, limit, &mut rng);

                assert_eq!(roll.values.len(), rolls as usize);
                assert!(roll.values.iter().all(|value| (1..=limit).contains(value)));

                let shown = roll.to_string();
                if rolls > 1 {
                    assert!(shown.ends_with(&format!(" = {}", roll.total())));
                } else {
                    assert!(!shown.contains('='));
                }
            }
        }
    }

    #[test]
    fn display_joins_values() {
        let roll = Roll { values: vec![3, 5, 1] };

        assert_eq!(roll.to_string(), "3 + 5 + 1 = 9");
        assert_eq!(Roll { values: vec![4] }.to_string(), "4");
    }

    #[test]
    fn flip_lands_on_both_sides() {
        let mut rng = StdRng::seed_from_u64(1);
        let sides: Vec<&str> = (0..64).map(|_| flip(&mut rng)).collect();

        assert!(sides.contains(&"Heads"));
        assert!(sides.contains(&"Tails"));
    }
}
