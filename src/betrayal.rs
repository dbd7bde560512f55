use std::fmt;

pub const MAX_PLAYERS: i64 = 8;

/// A playable explorer from Betrayal at House on the Hill.
#[derive(Debug, PartialEq)]
pub struct Character {
    pub name: &'static str,
    pub might: u8,
    pub speed: u8,
    pub sanity: u8,
    pub knowledge: u8,
}

const fn character(name: &'static str, might: u8, speed: u8, sanity: u8, knowledge: u8) -> Character {
    Character {
        name,
        might,
        speed,
        sanity,
        knowledge,
    }
}

/// Numbered from 1; characters `2k - 1` and `2k` share a colour.
pub static CHARACTERS: [Character; 12] = [
    character("Madame Zostra", 4, 3, 4, 4),
    character("Vivian Lopez", 2, 4, 4, 5),
    character("Darrin 'Flash' Williams", 3, 6, 3, 3),
    character("Ox Bellows", 5, 4, 3, 3),
    character("Brandon Jaspers", 4, 4, 4, 3),
    character("Peter Akimoto", 3, 4, 4, 4),
    character("Heather Granville", 3, 4, 3, 5),
    character("Jenny LeClerc", 4, 4, 4, 3),
    character("Zoe Ingstrom", 3, 4, 5, 3),
    character("Missy Dubourde", 3, 5, 3, 4),
    character("Professor Longfellow", 3, 4, 3, 5),
    character("Father Rhinehardt", 2, 3, 6, 4),
];

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\nMight: {}\nSpeed: {}\nSanity: {}\nKnowledge: {}",
            self.name, self.might, self.speed, self.sanity, self.knowledge
        )
    }
}

/// Validates the player count argument, returning the message to show when it is out of range.
pub fn player_count(players: i64) -> Result<usize, &'static str> {
    if players <= 0 {
        Err("Must end with number greater then 0")
    } else if players > MAX_PLAYERS {
        Err("Must end with number below 9")
    } else {
        Ok(players as usize)
    }
}

pub fn roster() -> String {
    CHARACTERS
        .iter()
        .enumerate()
        .map(|(index, character)| format!("{}: {}", character.name, index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, PartialEq)]
pub enum PickError {
    NotANumber,
    OutOfRange,
    AlreadyChosen,
    SameColour,
}

impl fmt::Display for PickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            PickError::NotANumber => "Incorrect input given",
            PickError::OutOfRange => "Incorrect number given",
            PickError::AlreadyChosen => "Character has already been chosen",
            PickError::SameColour => "Character with the same color has already been chosen",
        };

        f.write_str(message)
    }
}

/// Tracks the characters taken so far in one game.
#[derive(Debug, Default)]
pub struct Picker {
    chosen: Vec<usize>,
}

impl Picker {
    pub fn pick(&mut self, input: &str) -> Result<&'static Character, PickError> {
        let number: usize = input.trim().parse().map_err(|_| PickError::NotANumber)?;

        if !(1..=CHARACTERS.len()).contains(&number) {
            return Err(PickError::OutOfRange);
        }

        if self.chosen.contains(&number) {
            return Err(PickError::AlreadyChosen);
        }

        let same_colour = if number % 2 == 0 { number - 1 } else { number + 1 };
        if self.chosen.contains(&same_colour) {
            return Err(PickError::SameColour);
        }

        self.chosen.push(number);

        Ok(&CHARACTERS[number - 1])
    }

    pub fn summary(&self) -> String {
        self.chosen
            .iter()
            .map(|number| CHARACTERS[number - 1].to_string())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn player_count_bounds() {
        assert_eq!(player_count(0), Err("Must end with number greater then 0"));
        assert_eq!(player_count(9), Err("Must end with number below 9"));
        assert_eq!(player_count(1), Ok(1));
        assert_eq!(player_count(8), Ok(8));
    }

    #[test]
    fn roster_numbers_every_character() {
        let roster = roster();

        assert!(roster.starts_with("Madame Zostra: 1\nVivian Lopez: 2"));
        assert!(roster.ends_with("Father Rhinehardt: 12"));
        assert_eq!(roster.lines().count(), 12);
    }

    #[test]
    fn picks_reject_taken_and_same_colour() {
        let mut picker = Picker::default();

        assert_eq!(picker.pick("3").unwrap().name, "Darrin 'Flash' Williams");
        assert_eq!(picker.pick("3"), Err(PickError::AlreadyChosen));
        assert_eq!(picker.pick("4"), Err(PickError::SameColour));
        assert_eq!(picker.pick(" 12 ").unwrap().name, "Father Rhinehardt");
        assert_eq!(picker.pick("11"), Err(PickError::SameColour));
        assert_eq!(picker.pick("13"), Err(PickError::OutOfRange));
        assert_eq!(picker.pick("0"), Err(PickError::OutOfRange));
        assert_eq!(picker.pick("ox"), Err(PickError::NotANumber));
        assert_eq!(picker.pick("5").unwrap().name, "Brandon Jaspers");
    }

    #[test]
    fn summary_lists_stat_blocks_in_pick_order() {
        let mut picker = Picker::default();
        picker.pick("4").unwrap();
        picker.pick("1").unwrap();

        assert_eq!(
            picker.summary(),
            "Ox Bellows\nMight: 5\nSpeed: 4\nSanity: 3\nKnowledge: 3\n\n\
             Madame Zostra\nMight: 4\nSpeed: 3\nSanity: 4\nKnowledge: 4"
        );
    }
}
