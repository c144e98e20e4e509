use std::fmt;

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

/// Decode a field, falling back to its default when the value is `null` or
/// of the wrong type. One bad field must not drop the whole record.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// One record from the random-user API.
///
/// Nothing here is validated. Missing, null or mistyped fields decode to
/// empty values so the cards and the modal simply show less.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(deserialize_with = "lenient")]
    pub name: Name,
    #[serde(deserialize_with = "lenient")]
    pub email: String,
    #[serde(deserialize_with = "lenient")]
    pub phone: String,
    #[serde(deserialize_with = "lenient")]
    pub cell: String,
    #[serde(deserialize_with = "lenient")]
    pub location: Location,
    #[serde(deserialize_with = "lenient")]
    pub dob: DateOfBirth,
    #[serde(deserialize_with = "lenient")]
    pub picture: Picture,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Name {
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub first: String,
    #[serde(deserialize_with = "lenient")]
    pub last: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Location {
    #[serde(deserialize_with = "lenient")]
    pub street: Street,
    #[serde(deserialize_with = "lenient")]
    pub city: String,
    #[serde(deserialize_with = "lenient")]
    pub state: String,
    #[serde(deserialize_with = "lenient")]
    pub postcode: Postcode,
}

/// Older API versions send the street as one string, newer ones split it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Street {
    Text(String),
    Parts {
        #[serde(default, deserialize_with = "lenient")]
        number: i64,
        #[serde(default, deserialize_with = "lenient")]
        name: String,
    },
}

impl Default for Street {
    fn default() -> Self {
        Street::Text(String::new())
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Street::Text(text) => f.write_str(text),
            Street::Parts { number, name } => write!(f, "{} {}", number, name),
        }
    }
}

/// Postcodes arrive as strings for some nationalities and numbers for others.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Postcode {
    Text(String),
    Number(i64),
}

impl Default for Postcode {
    fn default() -> Self {
        Postcode::Text(String::new())
    }
}

impl fmt::Display for Postcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Postcode::Text(text) => f.write_str(text),
            Postcode::Number(number) => write!(f, "{}", number),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DateOfBirth {
    #[serde(deserialize_with = "lenient")]
    pub date: String,
    #[serde(deserialize_with = "lenient")]
    pub age: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Picture {
    #[serde(deserialize_with = "lenient")]
    pub large: String,
    #[serde(deserialize_with = "lenient")]
    pub medium: String,
    #[serde(deserialize_with = "lenient")]
    pub thumbnail: String,
}

impl User {
    /// "first last", as shown on a card.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name.first, self.name.last)
    }

    /// "Title. first last", as shown in the modal heading.
    pub fn heading(&self) -> String {
        if self.name.title.is_empty() {
            self.display_name()
        } else {
            format!("{}. {}", self.name.title, self.display_name())
        }
    }

    /// "city, state"
    pub fn location_line(&self) -> String {
        format!("{}, {}", self.location.city, self.location.state)
    }

    pub fn address_line(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.location.street, self.location.city, self.location.state, self.location.postcode
        )
    }

    /// The mobile number when present, otherwise the landline.
    pub fn contact_phone(&self) -> &str {
        if self.cell.is_empty() {
            &self.phone
        } else {
            &self.cell
        }
    }

    pub fn birth_date(&self) -> String {
        date_portion(&self.dob.date)
    }

    pub fn matches_name(&self, needle_lower: &str) -> bool {
        self.name.first.to_lowercase().contains(needle_lower)
            || self.name.last.to_lowercase().contains(needle_lower)
    }
}

/// Reduce a timestamp to its YYYY-MM-DD part. Returns an empty string when
/// no date can be found.
pub fn date_portion(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        let format = format_description!("[year]-[month]-[day]");
        if let Ok(formatted) = parsed.date().format(&format) {
            return formatted;
        }
    }
    scan_date(trimmed).unwrap_or_default().to_string()
}

fn scan_date(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    (0..=bytes.len() - 10)
        .find(|&start| {
            let window = &bytes[start..start + 10];
            window.iter().enumerate().all(|(idx, b)| match idx {
                4 | 7 => *b == b'-',
                _ => b.is_ascii_digit(),
            })
        })
        .map(|start| &raw[start..start + 10])
}
