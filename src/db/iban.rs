use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Character classes of the BBAN format notation in the SWIFT IBAN registry
#[derive(Clone, Copy, Debug)]
enum CharClass {
    /// `n`: digits
    N,
    /// `a`: uppercase letters
    A,
    /// `c`: digits and uppercase letters
    C,
}
use self::CharClass::{A, C, N};

impl CharClass {
    fn matches(self, c: char) -> bool {
        match self {
            N => c.is_ascii_digit(),
            A => c.is_ascii_uppercase(),
            C => c.is_ascii_digit() || c.is_ascii_uppercase(),
        }
    }
}

/// BBAN layout per country as (length, class) runs, taken from the SWIFT IBAN registry.
/// The IBAN is the country code, two check digits and the BBAN.
const BBAN_FORMATS: &[(&str, &[(usize, CharClass)])] = &[
    ("AD", &[(8, N), (12, C)]),
    ("AE", &[(19, N)]),
    ("AL", &[(8, N), (16, C)]),
    ("AT", &[(16, N)]),
    ("AZ", &[(4, A), (20, C)]),
    ("BA", &[(16, N)]),
    ("BE", &[(12, N)]),
    ("BG", &[(4, A), (6, N), (8, C)]),
    ("BH", &[(4, A), (14, C)]),
    ("BR", &[(23, N), (1, A), (1, C)]),
    ("BY", &[(4, C), (4, N), (16, C)]),
    ("CH", &[(5, N), (12, C)]),
    ("CR", &[(18, N)]),
    ("CY", &[(8, N), (16, C)]),
    ("CZ", &[(20, N)]),
    ("DE", &[(18, N)]),
    ("DK", &[(14, N)]),
    ("DO", &[(4, C), (20, N)]),
    ("EE", &[(16, N)]),
    ("EG", &[(25, N)]),
    ("ES", &[(20, N)]),
    ("FI", &[(14, N)]),
    ("FO", &[(14, N)]),
    ("FR", &[(10, N), (11, C), (2, N)]),
    ("GB", &[(4, A), (14, N)]),
    ("GE", &[(2, A), (16, N)]),
    ("GI", &[(4, A), (15, C)]),
    ("GL", &[(14, N)]),
    ("GR", &[(7, N), (16, C)]),
    ("GT", &[(24, C)]),
    ("HR", &[(17, N)]),
    ("HU", &[(24, N)]),
    ("IE", &[(4, A), (14, N)]),
    ("IL", &[(19, N)]),
    ("IQ", &[(4, A), (15, N)]),
    ("IS", &[(22, N)]),
    ("IT", &[(1, A), (10, N), (12, C)]),
    ("JO", &[(4, A), (4, N), (18, C)]),
    ("KW", &[(4, A), (22, C)]),
    ("KZ", &[(3, N), (13, C)]),
    ("LB", &[(4, N), (20, C)]),
    ("LC", &[(4, A), (24, C)]),
    ("LI", &[(5, N), (12, C)]),
    ("LT", &[(16, N)]),
    ("LU", &[(3, N), (13, C)]),
    ("LV", &[(4, A), (13, C)]),
    ("MC", &[(10, N), (11, C), (2, N)]),
    ("MD", &[(20, C)]),
    ("ME", &[(18, N)]),
    ("MK", &[(3, N), (10, C), (2, N)]),
    ("MR", &[(23, N)]),
    ("MT", &[(4, A), (5, N), (18, C)]),
    ("MU", &[(4, A), (19, N), (3, A)]),
    ("NL", &[(4, A), (10, N)]),
    ("NO", &[(11, N)]),
    ("PK", &[(4, A), (16, C)]),
    ("PL", &[(24, N)]),
    ("PS", &[(4, A), (21, C)]),
    ("PT", &[(21, N)]),
    ("QA", &[(4, A), (21, C)]),
    ("RO", &[(4, A), (16, C)]),
    ("RS", &[(18, N)]),
    ("SA", &[(2, N), (18, C)]),
    ("SC", &[(4, A), (20, N), (3, A)]),
    ("SE", &[(20, N)]),
    ("SI", &[(15, N)]),
    ("SK", &[(20, N)]),
    ("SM", &[(1, A), (10, N), (12, C)]),
    ("ST", &[(21, N)]),
    ("SV", &[(4, A), (20, N)]),
    ("TL", &[(19, N)]),
    ("TN", &[(20, N)]),
    ("TR", &[(6, N), (16, C)]),
    ("UA", &[(6, N), (19, C)]),
    ("VA", &[(18, N)]),
    ("VG", &[(4, A), (16, N)]),
    ("XK", &[(16, N)]),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IbanError {
    #[error("IBAN is empty")]
    Empty,
    #[error("IBAN contains invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("IBAN must start with a two letter country code")]
    InvalidCountryCode,
    #[error("Unknown country {0:?}")]
    UnknownCountry(String),
    #[error("Expected {expected} characters for this country but got {found}")]
    InvalidLength { expected: usize, found: usize },
    #[error("Account number doesn't match the format for {0}")]
    InvalidBban(String),
    #[error("Check digits must be two digits between 02 and 98")]
    InvalidCheckDigits,
    #[error("Checksum mismatch")]
    ChecksumMismatch,
}

/// A validated IBAN in its canonical form, i.e. uppercase without spaces.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Iban(String);

impl Iban {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Iban {
    type Err = IbanError;

    fn from_str(input: &str) -> Result<Self, IbanError> {
        let canonical: String = input
            .chars()
            .filter(|c| *c != ' ')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        validate(&canonical)?;
        Ok(Self(canonical))
    }
}

fn validate(iban: &str) -> Result<(), IbanError> {
    if iban.is_empty() {
        return Err(IbanError::Empty);
    }
    if let Some(invalid) = iban.chars().find(|c| !c.is_ascii_alphanumeric()) {
        return Err(IbanError::InvalidCharacter(invalid));
    }
    if iban.len() < 2 || !iban[..2].chars().all(|c| c.is_ascii_uppercase()) {
        return Err(IbanError::InvalidCountryCode);
    }
    let country = &iban[..2];
    let bban_format = BBAN_FORMATS
        .iter()
        .find(|(code, _)| *code == country)
        .map(|(_, format)| *format)
        .ok_or_else(|| IbanError::UnknownCountry(country.to_string()))?;
    let expected = 4 + bban_format.iter().map(|(length, _)| length).sum::<usize>();
    if iban.len() != expected {
        return Err(IbanError::InvalidLength {
            expected,
            found: iban.len(),
        });
    }
    let check_digits: u32 = iban[2..4]
        .parse()
        .map_err(|_| IbanError::InvalidCheckDigits)?;
    if !(2..=98).contains(&check_digits) {
        return Err(IbanError::InvalidCheckDigits);
    }
    let mut bban = &iban[4..];
    for &(length, class) in bban_format {
        let (part, rest) = bban.split_at(length);
        if !part.chars().all(|c| class.matches(c)) {
            return Err(IbanError::InvalidBban(country.to_string()));
        }
        bban = rest;
    }
    if mod97(iban) != 1 {
        return Err(IbanError::ChecksumMismatch);
    }
    Ok(())
}

/// ISO 7064 MOD 97-10 over the rearranged IBAN. Expects alphanumeric ASCII input.
fn mod97(iban: &str) -> u32 {
    let rearranged = iban[4..].chars().chain(iban[..4].chars());
    rearranged.fold(0, |remainder, c| {
        // Letters expand to two digits (A = 10 ... Z = 35)
        let value = c.to_digit(36).unwrap_or(0);
        let shift = if value < 10 { 10 } else { 100 };
        (remainder * shift + value) % 97
    })
}

impl TryFrom<String> for Iban {
    type Error = IbanError;

    fn try_from(value: String) -> Result<Self, IbanError> {
        value.parse()
    }
}

impl From<Iban> for String {
    fn from(iban: Iban) -> Self {
        iban.0
    }
}

impl Display for Iban {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for Iban {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Iban({})", self.0)
    }
}
