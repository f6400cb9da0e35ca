pub mod repo;
pub mod validate;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// 카탈로그 연산이 실패 했을 때 반환되는 에러 열거
///
/// HTTP 계층은 각 에러를 아래와 같이 응답 코드로 변환해야 한다.
/// - [`CatalogError::ValidationFailed`] → 400
/// - [`CatalogError::DuplicateIsbn`] → 400 혹은 409 (클라이언트 에러 클래스)
/// - [`CatalogError::StoreUnavailable`] → 500
///
/// 조회 대상이 없는 경우는 에러가 아닌 `Ok(None)`으로 표현되며 404로 변환된다.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// 입력 값이 도서 제약 조건을 위반함. 위반된 필드 목록을 가진다.
    ValidationFailed(Vec<FieldViolation>),

    /// 저장소의 ISBN 고유 제약 조건 위반
    DuplicateIsbn(String),

    /// 저장소 연결 불가 혹은 명령 실행 실패
    /// 내부 에러 메시지는 디버그 용도로만 사용하고 사용자에게 그대로 노출하지 않는다.
    StoreUnavailable(String),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::ValidationFailed(violations) => {
                let fields = violations.iter()
                    .map(|v| v.field())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Validation failed: {}", fields)
            }
            CatalogError::DuplicateIsbn(_) => write!(f, "A book with this ISBN already exists"),
            CatalogError::StoreUnavailable(_) => write!(f, "Book store is unavailable"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// 단일 필드의 제약 조건 위반
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    field: String,
    message: String,
}

impl FieldViolation {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_owned(),
            message: message.to_owned(),
        }
    }

    /// 위반된 필드의 와이어 이름 (`publishedYear` 등)
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// 목록에 없는 장르 문자열
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGenre(String);

impl Display for UnknownGenre {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a valid genre", self.0)
    }
}

impl std::error::Error for UnknownGenre {}

/// 도서 장르 열거
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Genre {
    Fiction,
    NonFiction,
    Science,
    Technology,
    Biography,
    History,
    Fantasy,
    Mystery,
    Romance,
    Thriller,
    Other,
}

impl Genre {
    /// 유효한 장르 전체 목록
    pub const ALL: [Genre; 11] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Science,
        Genre::Technology,
        Genre::Biography,
        Genre::History,
        Genre::Fantasy,
        Genre::Mystery,
        Genre::Romance,
        Genre::Thriller,
        Genre::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-Fiction",
            Genre::Science => "Science",
            Genre::Technology => "Technology",
            Genre::Biography => "Biography",
            Genre::History => "History",
            Genre::Fantasy => "Fantasy",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::Thriller => "Thriller",
            Genre::Other => "Other",
        }
    }
}

impl FromStr for Genre {
    type Err = UnknownGenre;

    // 장르 비교는 대소문자를 구분한다.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Fiction" => Ok(Genre::Fiction),
            "Non-Fiction" => Ok(Genre::NonFiction),
            "Science" => Ok(Genre::Science),
            "Technology" => Ok(Genre::Technology),
            "Biography" => Ok(Genre::Biography),
            "History" => Ok(Genre::History),
            "Fantasy" => Ok(Genre::Fantasy),
            "Mystery" => Ok(Genre::Mystery),
            "Romance" => Ok(Genre::Romance),
            "Thriller" => Ok(Genre::Thriller),
            "Other" => Ok(Genre::Other),
            _ => Err(UnknownGenre(value.to_owned())),
        }
    }
}

impl Display for Genre {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 도서
///
/// 저장소에 영속된 레코드만 이 타입으로 표현되며, 영속된 도서는 항상
/// [`validate::validate`]의 제약 조건을 만족한다. `isbn`은 하이픈이 제거된
/// 정규화 형태로 보관된다.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    id: String,
    title: String,
    author: String,
    isbn: String,
    published_year: i32,
    #[serde_as(as = "DisplayFromStr")]
    genre: Genre,
    price: f64,
    in_stock: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Book {
    /// 저장소가 부여한 식별자의 16진수 문자열 표현
    pub fn id(&self) -> &str {
        &self.id
    }

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

    /// 생성 시 한 번 설정되며 이후 변경되지 않는다.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 생성 시 설정되고 수정이 성공할 때마다 갱신된다.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 모든 필드가 채워진 초안으로 변환한다.
    /// 부분 수정 요청을 기존 레코드 위에 병합할 때 사용한다.
    pub fn to_draft(&self) -> BookDraft {
        BookDraft {
            title: Some(self.title.clone()),
            author: Some(self.author.clone()),
            isbn: Some(self.isbn.clone()),
            published_year: Some(self.published_year),
            genre: Some(self.genre.as_str().to_owned()),
            price: Some(self.price),
            in_stock: Some(self.in_stock),
        }
    }
}

/// 도서 생성/수정 요청 초안
///
/// 모든 필드가 선택 사항인 부분 레코드로, 생성 시에는 전체 초안으로
/// 수정 시에는 패치로 사용된다. `id`, `createdAt`, `updatedAt`은 외부에서
/// 설정할 수 없도록 필드 자체가 존재하지 않으며, 역직렬화 시 해당 키는
/// 무시된다.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    title: Option<String>,
    author: Option<String>,
    isbn: Option<String>,
    published_year: Option<i32>,
    genre: Option<String>,
    price: Option<f64>,
    in_stock: Option<bool>,
}

impl BookDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_owned());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_owned());
        self
    }

    pub fn isbn(mut self, isbn: &str) -> Self {
        self.isbn = Some(isbn.to_owned());
        self
    }

    pub fn published_year(mut self, published_year: i32) -> Self {
        self.published_year = Some(published_year);
        self
    }

    pub fn genre(mut self, genre: &str) -> Self {
        self.genre = Some(genre.to_owned());
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn in_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = Some(in_stock);
        self
    }

    /// 패치에 설정된 필드를 이 초안 위에 덮어쓴 새 초안을 반환한다.
    pub fn merge(self, patch: BookDraft) -> BookDraft {
        BookDraft {
            title: patch.title.or(self.title),
            author: patch.author.or(self.author),
            isbn: patch.isbn.or(self.isbn),
            published_year: patch.published_year.or(self.published_year),
            genre: patch.genre.or(self.genre),
            price: patch.price.or(self.price),
            in_stock: patch.in_stock.or(self.in_stock),
        }
    }
}

pub type SharedBookRepository = Arc<dyn BookRepository + Send + Sync>;

/// 도서 저장소
///
/// 카탈로그 상태는 이 트레이트의 쓰기 연산으로만 변경된다. 조회 연산은
/// 상태를 변경하지 않으며, 모든 목록 조회는 `createdAt` 내림차순(최신 우선)
/// 으로 정렬된다.
#[async_trait]
pub trait BookRepository {

    /// 초안을 검증하여 새 도서를 저장한다.
    /// 식별자와 생성/수정 시각은 저장 시점에 부여된다.
    async fn new_book(&self, draft: BookDraft) -> Result<Book, CatalogError>;

    /// 모든 도서를 가져온다.
    async fn get_all(&self) -> Result<Vec<Book>, CatalogError>;

    /// 전달 받은 아이디로 도서를 찾는다.
    /// 아이디 형식이 잘못 되었거나 해당 도서가 없으면 `Ok(None)`을 반환한다.
    async fn find_by_id(&self, id: &str) -> Result<Option<Book>, CatalogError>;

    /// 패치를 기존 도서 위에 병합하고 병합 결과 전체를 재검증하여 저장한다.
    /// 해당 도서가 없으면 `Ok(None)`을 반환하고 `updatedAt`은 성공 시에만 갱신된다.
    async fn update_book(&self, id: &str, patch: BookDraft) -> Result<Option<Book>, CatalogError>;

    /// 도서를 영구 삭제하고 삭제 직전의 레코드를 반환한다.
    /// 해당 도서가 없으면 `Ok(None)`을 반환한다.
    async fn delete_book(&self, id: &str) -> Result<Option<Book>, CatalogError>;

    /// 제목 혹은 저자에 키워드가 부분 일치(대소문자 무시)하는 도서를 찾는다.
    /// 빈 키워드는 호출자 에러로 [`CatalogError::ValidationFailed`]를 반환한다.
    async fn search(&self, keyword: &str) -> Result<Vec<Book>, CatalogError>;

    /// 전달 받은 장르와 정확히 일치하는 도서를 찾는다.
    /// 목록에 없는 장르 문자열은 에러가 아닌 빈 결과를 반환한다.
    async fn find_by_genre(&self, genre: &str) -> Result<Vec<Book>, CatalogError>;

    /// 재고가 있는(`inStock == true`) 도서를 찾는다.
    async fn find_in_stock(&self) -> Result<Vec<Book>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_book() -> Book {
        Book {
            id: "65f1a2b3c4d5e6f7a8b9c0d1".to_owned(),
            title: "War and Peace".to_owned(),
            author: "Leo Tolstoy".to_owned(),
            isbn: "9780134685991".to_owned(),
            published_year: 1869,
            genre: Genre::Fiction,
            price: 12.5,
            in_stock: true,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn genre_from_str_round_trip() {
        for genre in Genre::ALL {
            assert_eq!(genre.as_str().parse::<Genre>(), Ok(genre));
        }
    }

    #[test]
    fn genre_from_str_is_case_sensitive() {
        assert!("fiction".parse::<Genre>().is_err());
        assert!("NON-FICTION".parse::<Genre>().is_err());
        assert_eq!("Non-Fiction".parse::<Genre>(), Ok(Genre::NonFiction));
    }

    #[test]
    fn merge_overwrites_only_patched_fields() {
        let base = sample_book().to_draft();
        let patch = BookDraft::new().price(20.0).in_stock(false);

        let merged = base.merge(patch);

        assert_eq!(merged.price, Some(20.0));
        assert_eq!(merged.in_stock, Some(false));
        assert_eq!(merged.title, Some("War and Peace".to_owned()));
        assert_eq!(merged.isbn, Some("9780134685991".to_owned()));
    }

    #[test]
    fn draft_deserialization_ignores_identifier_and_timestamps() {
        let draft: BookDraft = serde_json::from_str(
            r#"{
                "_id": "65f1a2b3c4d5e6f7a8b9c0d1",
                "title": "Dune",
                "publishedYear": 1965,
                "createdAt": "2024-03-01T12:00:00Z",
                "updatedAt": "2024-03-02T12:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(draft.title, Some("Dune".to_owned()));
        assert_eq!(draft.published_year, Some(1965));
        assert_eq!(draft.author, None);
    }

    #[test]
    fn book_serializes_with_wire_field_names() {
        let book = Book {
            genre: Genre::NonFiction,
            ..sample_book()
        };

        let json = serde_json::to_value(&book).unwrap();

        assert_eq!(json["id"], "65f1a2b3c4d5e6f7a8b9c0d1");
        assert_eq!(json["publishedYear"], 1869);
        assert_eq!(json["inStock"], true);
        assert_eq!(json["genre"], "Non-Fiction");
        assert_eq!(json["createdAt"], "2024-03-01T12:00:00Z");
    }
}
