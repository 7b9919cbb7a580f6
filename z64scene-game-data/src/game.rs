use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use z64scene_datablob::BlobSegments;
use z64scene_segment::SegmentTable;

/// Which game's dialect of the scene formats to use.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Game {
    Oot,
    Mm,
}

impl Display for Game {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Game::Oot => write!(f, "oot"),
            Game::Mm => write!(f, "mm"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown game {0:?}, expected \"oot\" or \"mm\"")]
pub struct UnknownGame(String);

impl FromStr for Game {
    type Err = UnknownGame;

    fn from_str(s: &str) -> Result<Self, UnknownGame> {
        match s.to_ascii_lowercase().as_str() {
            "oot" => Ok(Game::Oot),
            "mm" => Ok(Game::Mm),
            _ => Err(UnknownGame(s.to_string())),
        }
    }
}

/// State threaded through one parse: the dialect and the segment registrations.
pub struct ParseContext<'a> {
    pub game: Game,
    pub segments: BlobSegments<'a>,
}

impl<'a> ParseContext<'a> {
    pub fn new(game: Game) -> Self {
        Self {
            game,
            segments: BlobSegments::new(),
        }
    }

    pub fn segment_table(&self) -> &SegmentTable<'a> {
        self.segments.segment_table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_game() {
        assert_eq!("OoT".parse::<Game>().unwrap(), Game::Oot);
        assert_eq!("mm".parse::<Game>().unwrap(), Game::Mm);
        assert!("majora".parse::<Game>().is_err());
    }
}
