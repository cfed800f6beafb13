//! Goodreads shelf feed reader
//!
//! Public shelves are exposed as paged RSS at
//! `/review/list_rss/<user>?shelf=<name>&page=<n>`. Each `<item>` carries the
//! book's title, author, the reader's rating and a few display fields.

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client as HttpClient;

use crate::{
    error::{AppError, AppResult},
    models::ShelfBook,
};

const FEED_BASE_URL: &str = "https://www.goodreads.com/review/list_rss";

const FEED_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Lowest rating that counts as a loved book
pub const LOVED_RATING: u8 = 4;

/// Source of shelved books
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ShelfSource: Send + Sync {
    /// Reads up to `pages` feed pages of a shelf.
    ///
    /// Stops at the first page that fails, cannot be parsed or has no items,
    /// and returns the books read so far.
    async fn fetch_shelf(&self, shelf: &str, pages: u32) -> Vec<ShelfBook>;
}

/// Books the reader wants to read
pub async fn to_read_books(source: &dyn ShelfSource, pages: u32) -> Vec<ShelfBook> {
    source.fetch_shelf("to-read", pages).await
}

/// Books the reader rated 4 or 5 stars
pub async fn top_rated_books(source: &dyn ShelfSource, pages: u32) -> Vec<ShelfBook> {
    source
        .fetch_shelf("read", pages)
        .await
        .into_iter()
        .filter(|book| book.user_rating >= LOVED_RATING)
        .collect()
}

#[derive(Clone)]
pub struct GoodreadsShelf {
    http_client: HttpClient,
    user_id: String,
    feed_url: String,
}

impl GoodreadsShelf {
    pub fn new(http_client: HttpClient, user_id: String) -> Self {
        Self {
            http_client,
            user_id,
            feed_url: FEED_BASE_URL.to_string(),
        }
    }

    async fn fetch_page(&self, shelf: &str, page: u32) -> AppResult<String> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(FEED_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/rss+xml, application/xml, text/xml"),
        );

        let page = page.to_string();
        let response = self
            .http_client
            .get(format!("{}/{}", self.feed_url, self.user_id))
            .headers(headers)
            .query(&[("shelf", shelf), ("page", page.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "Goodreads returned status {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait::async_trait]
impl ShelfSource for GoodreadsShelf {
    async fn fetch_shelf(&self, shelf: &str, pages: u32) -> Vec<ShelfBook> {
        let mut books = Vec::new();

        for page in 1..=pages {
            let feed = match self.fetch_page(shelf, page).await {
                Ok(feed) => feed,
                Err(e) => {
                    tracing::warn!(shelf = %shelf, page, error = %e, "Shelf page fetch failed");
                    break;
                }
            };

            let items = match parse_shelf_feed(&feed) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(shelf = %shelf, page, error = %e, "Shelf feed unreadable");
                    break;
                }
            };

            if items.is_empty() {
                break;
            }

            books.extend(items);
        }

        tracing::info!(shelf = %shelf, books = books.len(), "Shelf fetched");

        books
    }
}

/// Item fields read from the feed
#[derive(Clone, Copy)]
enum Field {
    Title,
    Author,
    UserRating,
    AverageRating,
    Image,
    BookId,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"title" => Some(Field::Title),
            b"author_name" => Some(Field::Author),
            b"user_rating" => Some(Field::UserRating),
            b"average_rating" => Some(Field::AverageRating),
            b"book_image_url" => Some(Field::Image),
            b"book_id" => Some(Field::BookId),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ItemFields {
    title: String,
    author: String,
    user_rating: String,
    average_rating: String,
    image: String,
    book_id: String,
}

impl ItemFields {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Author => &mut self.author,
            Field::UserRating => &mut self.user_rating,
            Field::AverageRating => &mut self.average_rating,
            Field::Image => &mut self.image,
            Field::BookId => &mut self.book_id,
        };
        *slot = value.trim().to_string();
    }

    /// Items without a title are dropped
    fn into_book(self) -> Option<ShelfBook> {
        if self.title.is_empty() {
            return None;
        }

        Some(ShelfBook {
            title: self.title,
            author: self.author,
            user_rating: self.user_rating.parse().unwrap_or(0),
            avg_rating: self.average_rating.parse().unwrap_or(0.0),
            image: self.image,
            book_id: self.book_id,
        })
    }
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn resolve_entity(entity: &str) -> Option<char> {
    match entity {
        "apos" => Some('\''),
        "quot" => Some('"'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Parses one RSS page into shelf books, in feed order
pub fn parse_shelf_feed(xml: &str) -> Result<Vec<ShelfBook>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);

    let mut books = Vec::new();
    let mut item: Option<ItemFields> = None;
    let mut current: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let tag = local_name(name.as_ref());
                if tag == b"item" {
                    item = Some(ItemFields::default());
                } else if item.is_some() {
                    current = Field::from_tag(tag);
                    text.clear();
                }
            }
            Event::Text(e) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if current.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(c) = resolve_entity(&entity) {
                        text.push(c);
                    }
                }
            }
            Event::End(e) => {
                let name = e.name();
                let tag = local_name(name.as_ref());
                if tag == b"item" {
                    current = None;
                    if let Some(book) = item.take().and_then(ItemFields::into_book) {
                        books.push(book);
                    }
                } else if let (Some(field), Some(fields)) = (current, item.as_mut()) {
                    if Field::from_tag(tag).is_some() {
                        fields.set(field, std::mem::take(&mut text));
                        current = None;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(books)
}
