use crate::book::validate::{self, ValidatedBook};
use crate::book::{Book, BookDraft, BookRepository, CatalogError, FieldViolation, Genre};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tracing::{debug, error};

/// 도서 컬렉션이 위치하는 기본 데이터베이스 이름
pub const DEFAULT_DATABASE: &str = "bookstore";

/// 기본 도서 컬렉션 이름
pub const DEFAULT_COLLECTION: &str = "books";

// MongoDB가 고유 인덱스 위반 시 돌려주는 에러 코드
const DUPLICATE_KEY_CODE: i32 = 11000;

/// 도서 컬렉션에 영속되는 문서
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    author: String,
    isbn: String,
    published_year: i32,
    #[serde_as(as = "DisplayFromStr")]
    genre: Genre,
    price: f64,
    in_stock: bool,
    created_at: mongodb::bson::DateTime,
    updated_at: mongodb::bson::DateTime,
}

impl BookDocument {
    fn new(
        fields: &ValidatedBook,
        id: ObjectId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: fields.title().to_owned(),
            author: fields.author().to_owned(),
            isbn: fields.isbn().to_owned(),
            published_year: fields.published_year(),
            genre: fields.genre(),
            price: fields.price(),
            in_stock: fields.in_stock(),
            created_at: to_bson_datetime(created_at),
            updated_at: to_bson_datetime(updated_at),
        }
    }

    fn to_domain(&self) -> Book {
        Book {
            id: self.id.to_hex(),
            title: self.title.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
            published_year: self.published_year,
            genre: self.genre,
            price: self.price,
            in_stock: self.in_stock,
            created_at: to_chrono(self.created_at),
            updated_at: to_chrono(self.updated_at),
        }
    }
}

/// MongoDB 기반 도서 저장소
///
/// 프로세스 시작 시 생성된 클라이언트를 주입 받아 생성하며, 호출 별로
/// 단일 문서 연산 하나를 실행한다. ISBN 고유 제약은 사전 조회가 아닌
/// 저장소의 고유 인덱스([`MongoBookRepository::ensure_indexes`])가
/// 원자적으로 강제한다.
pub struct MongoBookRepository {
    collection: Collection<BookDocument>,
}

impl MongoBookRepository {
    /// 기본 데이터베이스/컬렉션 이름으로 저장소를 생성한다.
    pub fn new(client: Client) -> Self {
        Self::with_names(client, DEFAULT_DATABASE, DEFAULT_COLLECTION)
    }

    /// 데이터베이스와 컬렉션 이름을 지정하여 저장소를 생성한다.
    pub fn with_names(client: Client, database: &str, collection: &str) -> Self {
        let collection = client
            .database(database)
            .collection::<BookDocument>(collection);

        Self { collection }
    }

    /// 컬렉션 인덱스를 생성한다. 프로세스 시작 시 한 번 호출한다.
    ///
    /// `isbn` 고유 인덱스가 동시 생성 경합의 승자를 결정하므로 쓰기 연산
    /// 전에 반드시 존재해야 한다. `title`, `author` 보조 인덱스는 검색
    /// 조회를 위한 것이다. 이미 존재하는 인덱스는 무시된다.
    pub async fn ensure_indexes(&self) -> Result<(), CatalogError> {
        let unique_isbn = IndexModel::builder()
            .keys(doc! { "isbn": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let by_title = IndexModel::builder().keys(doc! { "title": 1 }).build();
        let by_author = IndexModel::builder().keys(doc! { "author": 1 }).build();

        self.collection
            .create_indexes([unique_isbn, by_title, by_author])
            .await
            .map_err(reclassify)?;

        Ok(())
    }

    async fn find_newest_first(&self, filter: Document) -> Result<Vec<Book>, CatalogError> {
        let cursor = self.collection
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .await
            .map_err(reclassify)?;

        let documents: Vec<BookDocument> = cursor.try_collect().await.map_err(reclassify)?;

        Ok(documents.iter().map(BookDocument::to_domain).collect())
    }
}

#[async_trait]
impl BookRepository for MongoBookRepository {
    async fn new_book(&self, draft: BookDraft) -> Result<Book, CatalogError> {
        let fields = validate::validate(&draft)?;

        let now = Utc::now();
        let document = BookDocument::new(&fields, ObjectId::new(), now, now);

        self.collection
            .insert_one(&document)
            .await
            .map_err(|e| reclassify_write(e, fields.isbn()))?;

        debug!(isbn = fields.isbn(), "new book saved");
        Ok(document.to_domain())
    }

    async fn get_all(&self) -> Result<Vec<Book>, CatalogError> {
        self.find_newest_first(doc! {}).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Book>, CatalogError> {
        let object_id = match ObjectId::parse_str(id) {
            Ok(object_id) => object_id,
            Err(_) => return Ok(None),
        };

        let found = self.collection
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(reclassify)?;

        Ok(found.map(|document| document.to_domain()))
    }

    async fn update_book(&self, id: &str, patch: BookDraft) -> Result<Option<Book>, CatalogError> {
        let object_id = match ObjectId::parse_str(id) {
            Ok(object_id) => object_id,
            Err(_) => return Ok(None),
        };

        let existing = match self.collection
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(reclassify)?
        {
            Some(document) => document,
            None => return Ok(None),
        };

        let merged = existing.to_domain().to_draft().merge(patch);
        let fields = validate::validate(&merged)?;

        // createdAt은 기존 값을 유지하고 updatedAt만 갱신한다.
        let replacement = BookDocument::new(
            &fields,
            existing.id,
            to_chrono(existing.created_at),
            Utc::now(),
        );

        let updated = self.collection
            .find_one_and_replace(doc! { "_id": existing.id }, &replacement)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| reclassify_write(e, fields.isbn()))?;

        if updated.is_some() {
            debug!(id = id, "book updated");
        }
        Ok(updated.map(|document| document.to_domain()))
    }

    async fn delete_book(&self, id: &str) -> Result<Option<Book>, CatalogError> {
        let object_id = match ObjectId::parse_str(id) {
            Ok(object_id) => object_id,
            Err(_) => return Ok(None),
        };

        let deleted = self.collection
            .find_one_and_delete(doc! { "_id": object_id })
            .await
            .map_err(reclassify)?;

        if deleted.is_some() {
            debug!(id = id, "book deleted");
        }
        Ok(deleted.map(|document| document.to_domain()))
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Book>, CatalogError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(CatalogError::ValidationFailed(vec![FieldViolation::new(
                "query",
                "Search query is required",
            )]));
        }

        self.find_newest_first(search_filter(keyword)).await
    }

    async fn find_by_genre(&self, genre: &str) -> Result<Vec<Book>, CatalogError> {
        self.find_newest_first(doc! { "genre": genre }).await
    }

    async fn find_in_stock(&self) -> Result<Vec<Book>, CatalogError> {
        self.find_newest_first(doc! { "inStock": true }).await
    }
}

/// 제목 혹은 저자에 키워드가 부분 일치하는 문서 필터
///
/// 키워드는 정규식 메타 문자를 이스케이프하여 항상 리터럴로 일치시킨다.
fn search_filter(keyword: &str) -> Document {
    let pattern = regex::escape(keyword);

    doc! {
        "$or": [
            { "title": { "$regex": pattern.as_str(), "$options": "i" } },
            { "author": { "$regex": pattern.as_str(), "$options": "i" } },
        ]
    }
}

fn reclassify(e: mongodb::error::Error) -> CatalogError {
    error!("{:?}", e);
    CatalogError::StoreUnavailable(e.to_string())
}

fn reclassify_write(e: mongodb::error::Error, isbn: &str) -> CatalogError {
    if is_duplicate_key(&e) {
        return CatalogError::DuplicateIsbn(isbn.to_owned());
    }
    reclassify(e)
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn to_bson_datetime(t: DateTime<Utc>) -> mongodb::bson::DateTime {
    mongodb::bson::DateTime::from_millis(t.timestamp_millis())
}

fn to_chrono(t: mongodb::bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(t.timestamp_millis()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    fn sample_document() -> BookDocument {
        let fields = validate::validate(
            &BookDraft::new()
                .title("Clean Architecture")
                .author("Robert C. Martin")
                .isbn("978-0-13-449416-6")
                .published_year(2017)
                .genre("Technology")
                .price(31.99),
        )
        .unwrap();

        BookDocument::new(
            &fields,
            ObjectId::parse_str("65f1a2b3c4d5e6f7a8b9c0d1").unwrap(),
            DateTime::from_timestamp_millis(1_709_294_400_000).unwrap(),
            DateTime::from_timestamp_millis(1_709_380_800_000).unwrap(),
        )
    }

    #[test]
    fn document_serializes_with_wire_field_names() {
        let serialized = bson::to_document(&sample_document()).unwrap();

        assert!(serialized.contains_key("_id"));
        assert!(serialized.contains_key("publishedYear"));
        assert!(serialized.contains_key("inStock"));
        assert!(serialized.contains_key("createdAt"));
        assert_eq!(serialized.get_str("genre").unwrap(), "Technology");
        assert_eq!(serialized.get_str("isbn").unwrap(), "9780134494166");
    }

    #[test]
    fn document_round_trips_through_bson() {
        let document = sample_document();

        let serialized = bson::to_document(&document).unwrap();
        let deserialized: BookDocument = bson::from_document(serialized).unwrap();

        assert_eq!(deserialized, document);
    }

    #[test]
    fn to_domain_exposes_hex_id_and_chrono_timestamps() {
        let book = sample_document().to_domain();

        assert_eq!(book.id(), "65f1a2b3c4d5e6f7a8b9c0d1");
        assert_eq!(book.title(), "Clean Architecture");
        assert_eq!(book.created_at().timestamp_millis(), 1_709_294_400_000);
        assert_eq!(book.updated_at().timestamp_millis(), 1_709_380_800_000);
        assert!(book.updated_at() >= book.created_at());
    }

    #[test]
    fn search_filter_escapes_regex_metacharacters() {
        let filter = search_filter("C++ (2nd)");

        let expected = doc! {
            "$or": [
                { "title": { "$regex": r"C\+\+ \(2nd\)", "$options": "i" } },
                { "author": { "$regex": r"C\+\+ \(2nd\)", "$options": "i" } },
            ]
        };
        assert_eq!(filter, expected);
    }

    #[test]
    fn datetime_conversion_round_trips() {
        let now = DateTime::from_timestamp_millis(1_714_000_000_123).unwrap();

        assert_eq!(to_chrono(to_bson_datetime(now)), now);
    }
}
