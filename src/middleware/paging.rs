use mongodb::options::FindOptions;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use std::convert::Infallible;

pub const DEFAULT_PAGE_LENGTH: u32 = 20;
pub const MAX_PAGE_LENGTH: u32 = 100;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PageState {
    pub page_length: u32,
    pub page: u32,
}

impl Default for PageState {
    fn default() -> Self {
        PageState {
            page_length: DEFAULT_PAGE_LENGTH,
            page: 0,
        }
    }
}

impl PageState {
    pub fn new(page: u32, page_length: u32) -> PageState {
        PageState {
            page_length: page_length.clamp(1, MAX_PAGE_LENGTH),
            page,
        }
    }

    pub fn skip(&self) -> u64 {
        self.page as u64 * self.page_length as u64
    }

    /// Sets `skip` and `limit` on `options` for this page.
    pub fn apply(&self, mut options: FindOptions) -> FindOptions {
        options.skip = Some(self.skip());
        options.limit = Some(self.page_length as i64);
        options
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PageState {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let length: Option<u32> = request
            .query_value("len")
            .and_then(|it| it.ok())
            .or_else(|| request.query_value("l").and_then(|it| it.ok()));

        let page: Option<u32> = request
            .query_value("page")
            .and_then(|it| it.ok())
            .or_else(|| request.query_value("p").and_then(|it| it.ok()));

        Outcome::Success(PageState::new(
            page.unwrap_or(0),
            length.unwrap_or(DEFAULT_PAGE_LENGTH),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_length_is_clamped() {
        assert_eq!(PageState::new(0, 0).page_length, 1);
        assert_eq!(PageState::new(0, 5000).page_length, MAX_PAGE_LENGTH);
    }

    #[test]
    fn find_options_skip_whole_pages() {
        let options = PageState::new(3, 25).apply(FindOptions::default());

        assert_eq!(options.skip, Some(75));
        assert_eq!(options.limit, Some(25));
    }
}
