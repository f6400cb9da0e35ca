use crate::book::{BookDraft, CatalogError, FieldViolation, Genre};
use chrono::Datelike;

/// 제목 최대 길이
pub const TITLE_MAX_LENGTH: usize = 200;

/// 저자명 최소 길이
pub const AUTHOR_MIN_LENGTH: usize = 2;

/// 허용되는 가장 이른 출판 연도
pub const PUBLISHED_YEAR_MIN: i32 = 1000;

/// 검증을 통과한 도서 필드
///
/// 문자열 필드는 양쪽 공백이 제거된 상태이고 ISBN은 하이픈이 제거된
/// 정규화 형태이다. 저장소는 이 타입으로만 새 문서를 만든다.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBook {
    title: String,
    author: String,
    isbn: String,
    published_year: i32,
    genre: Genre,
    price: f64,
    in_stock: bool,
}

impl ValidatedBook {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// 하이픈이 제거된 10자리 혹은 13자리 ISBN
    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn published_year(&self) -> i32 {
        self.published_year
    }

    pub fn genre(&self) -> Genre {
        self.genre
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn in_stock(&self) -> bool {
        self.in_stock
    }
}

/// 도서 초안의 모든 필드를 검증한다.
///
/// 필드 별로 독립적으로 검사하며 첫 위반에서 중단하지 않고 발견된 위반을
/// 전부 수집해 반환한다. ISBN의 저장소 고유 제약은 다른 레코드를 볼 수
/// 없는 이 모듈이 아닌 저장소가 쓰기 시점에 검사한다.
///
/// 출판 연도 상한은 호출 시점의 달력 연도로 평가되므로, 과거에 유효했던
/// 레코드도 수정 시 전체 재검증 과정에서 다시 평가된다.
///
/// # Example
/// ```
/// use book_catalog_rust::book::BookDraft;
/// use book_catalog_rust::book::validate::validate;
///
/// let draft = BookDraft::new()
///     .title("War and Peace")
///     .author("Leo Tolstoy")
///     .isbn("978-0-13-468599-1")
///     .published_year(1869)
///     .genre("Fiction")
///     .price(12.5);
///
/// let validated = validate(&draft).unwrap();
/// assert_eq!(validated.isbn(), "9780134685991");
/// assert!(validated.in_stock());
/// ```
pub fn validate(draft: &BookDraft) -> Result<ValidatedBook, CatalogError> {
    let mut violations: Vec<FieldViolation> = Vec::new();

    let title = match draft.title.as_deref().map(str::trim) {
        None => {
            violations.push(FieldViolation::new("title", "Book title is required"));
            None
        }
        Some(title) if title.is_empty() => {
            violations.push(FieldViolation::new("title", "Title must be at least 1 character long"));
            None
        }
        Some(title) if title.chars().count() > TITLE_MAX_LENGTH => {
            violations.push(FieldViolation::new("title", "Title cannot exceed 200 characters"));
            None
        }
        Some(title) => Some(title.to_owned()),
    };

    let author = match draft.author.as_deref().map(str::trim) {
        None => {
            violations.push(FieldViolation::new("author", "Author name is required"));
            None
        }
        Some(author) if author.chars().count() < AUTHOR_MIN_LENGTH => {
            violations.push(FieldViolation::new("author", "Author name must be at least 2 characters long"));
            None
        }
        Some(author) => Some(author.to_owned()),
    };

    let isbn = match draft.isbn.as_deref() {
        None => {
            violations.push(FieldViolation::new("isbn", "ISBN is required"));
            None
        }
        Some(isbn) => {
            let normalized = normalize_isbn(isbn);
            if normalized.is_none() {
                violations.push(FieldViolation::new("isbn", "Please provide a valid ISBN-10 or ISBN-13"));
            }
            normalized
        }
    };

    let published_year = match draft.published_year {
        None => {
            violations.push(FieldViolation::new("publishedYear", "Published year is required"));
            None
        }
        Some(year) if year < PUBLISHED_YEAR_MIN => {
            violations.push(FieldViolation::new("publishedYear", "Published year must be after 1000"));
            None
        }
        Some(year) if year > current_year() => {
            violations.push(FieldViolation::new("publishedYear", "Published year cannot be in the future"));
            None
        }
        Some(year) => Some(year),
    };

    let genre = match draft.genre.as_deref().map(str::trim) {
        None => {
            violations.push(FieldViolation::new("genre", "Genre is required"));
            None
        }
        Some(genre) => match genre.parse::<Genre>() {
            Ok(genre) => Some(genre),
            Err(unknown) => {
                violations.push(FieldViolation::new("genre", &unknown.to_string()));
                None
            }
        },
    };

    let price = match draft.price {
        None => {
            violations.push(FieldViolation::new("price", "Price is required"));
            None
        }
        // NaN은 비교에 실패하여 음수와 같이 거부된다.
        Some(price) if !(price >= 0.0) => {
            violations.push(FieldViolation::new("price", "Price cannot be negative"));
            None
        }
        Some(price) => Some(price),
    };

    if !violations.is_empty() {
        return Err(CatalogError::ValidationFailed(violations));
    }

    Ok(ValidatedBook {
        title: title.unwrap(),
        author: author.unwrap(),
        isbn: isbn.unwrap(),
        published_year: published_year.unwrap(),
        genre: genre.unwrap(),
        price: price.unwrap(),
        in_stock: draft.in_stock.unwrap_or(true),
    })
}

/// ISBN의 하이픈을 제거한 정규화 문자열을 반환한다.
///
/// 하이픈 제거 후 전체가 숫자이면서 정확히 10자리 혹은 13자리인 경우에만
/// 유효하다. 체크섬 검증은 하지 않는다.
///
/// # Example
/// ```
/// use book_catalog_rust::book::validate::normalize_isbn;
///
/// assert_eq!(normalize_isbn("978-0-13-468599-1"), Some(String::from("9780134685991")));
/// assert_eq!(normalize_isbn("1234567890"), Some(String::from("1234567890")));
/// assert_eq!(normalize_isbn("12345"), None);
/// ```
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let digits = raw.trim()
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>();

    let length_ok = digits.len() == 10 || digits.len() == 13;
    if length_ok && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}
