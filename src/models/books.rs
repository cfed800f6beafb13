use serde::{Deserialize, Serialize};

/// A book read from a Goodreads shelf feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShelfBook {
    pub title: String,
    pub author: String,
    /// The reader's own rating, 0 when unrated
    pub user_rating: u8,
    pub avg_rating: f64,
    pub image: String,
    pub book_id: String,
}

/// A single pick returned by the ranking model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedPick {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub reason: String,
}

/// A recommended book, ranked picks first and the rest of the to-read shelf after
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub author: String,
    pub reason: String,
    pub image: String,
    pub avg_rating: f64,
}

impl From<&ShelfBook> for Recommendation {
    fn from(book: &ShelfBook) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            reason: String::new(),
            image: book.image.clone(),
            avg_rating: book.avg_rating,
        }
    }
}
