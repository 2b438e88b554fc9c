use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::content::hooks::{
    derive_slug_if_absent, estimate_read_time, stamp_published_at, Changes, Hook, Lifecycle,
};
use crate::content::slug::derive_slug;
use crate::error::AppError;

/// A record stored in its own collection.
///
/// Every entity carries a string `_id` and `createdAt`/`updatedAt`
/// timestamps, and declares which fields are covered by a unique index.
pub trait Entity:
    Lifecycle + Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static
{
    /// Collection name in MongoDB.
    const COLLECTION: &'static str;
    /// Fields with a unique index.
    const UNIQUE_FIELDS: &'static [&'static str] = &["slug"];
    /// Localized "not found" message.
    const NOT_FOUND: &'static str;

    fn id(&self) -> &str;

    /// Assign a fresh identity, as done on insert.
    fn assign_identity(&mut self, id: String, now: DateTime<Utc>);

    fn touch(&mut self, now: DateTime<Utc>);

    /// Schema validation, run after the hook chain.
    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Entities with a manual display order.
pub trait Ordered: Entity {
    fn set_order(&mut self, order: i64);
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_true() -> bool {
    true
}

/// Collects validation messages and joins them like the storage layer does.
#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn require(&mut self, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.0.push(message.to_string());
        }
    }

    fn max_len(&mut self, value: Option<&str>, max: usize, message: &str) {
        if value.is_some_and(|v| v.chars().count() > max) {
            self.0.push(message.to_string());
        }
    }

    fn check(&mut self, ok: bool, message: &str) {
        if !ok {
            self.0.push(message.to_string());
        }
    }

    fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0.join(", ")))
        }
    }
}

// ---------------------------------------------------------------------------
// Blog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
}

impl PublishStatus {
    pub fn toggled(self) -> Self {
        match self {
            PublishStatus::Draft => PublishStatus::Published,
            PublishStatus::Published => PublishStatus::Draft,
        }
    }
}

fn default_read_time() -> String {
    "5 دقائق".to_string()
}

fn default_author() -> String {
    "شركة عزل الأسطح".to_string()
}

/// A blog article.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub image_query: String,
    #[serde(default)]
    pub category: String,
    /// Id of the owning [`Category`], if linked.
    #[serde(default)]
    pub category_ref: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_read_time")]
    pub read_time: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub related_services: Vec<String>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
    /// First publication time; never reset once set.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn blog_normalize(blog: &mut Blog, _: &Changes, _: DateTime<Utc>) {
    blog.title = blog.title.trim().to_string();
    blog.slug = derive_slug(&blog.slug);
    for tag in blog.tags.iter_mut() {
        *tag = tag.trim().to_string();
    }
}

fn blog_slug(blog: &mut Blog, changes: &Changes, _: DateTime<Utc>) {
    derive_slug_if_absent(&mut blog.slug, &blog.title, "title", changes);
}

fn blog_read_time(blog: &mut Blog, changes: &Changes, _: DateTime<Utc>) {
    if changes.contains("content") {
        blog.read_time = estimate_read_time(&blog.content);
    }
}

fn blog_published_at(blog: &mut Blog, changes: &Changes, now: DateTime<Utc>) {
    let published = blog.status == PublishStatus::Published;
    stamp_published_at(&mut blog.published_at, published, changes, now);
}

impl Lifecycle for Blog {
    fn hooks() -> &'static [Hook<Self>] {
        &[blog_normalize, blog_slug, blog_read_time, blog_published_at]
    }
}

impl Ordered for Blog {
    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Entity for Blog {
    const COLLECTION: &'static str = "blogs";
    const NOT_FOUND: &'static str = "المقال غير موجود";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_identity(&mut self, id: String, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut v = Violations::default();
        v.require(&self.slug, "الرابط مطلوب");
        v.require(&self.title, "عنوان المقال مطلوب");
        v.require(&self.excerpt, "الوصف المختصر مطلوب");
        v.max_len(Some(&self.excerpt), 500, "الوصف المختصر يجب ألا يتجاوز 500 حرف");
        v.require(&self.content, "محتوى المقال مطلوب");
        v.require(&self.image, "صورة المقال مطلوبة");
        v.require(&self.category, "قسم المقال مطلوب");
        v.max_len(self.meta_title.as_deref(), 70, "عنوان SEO يجب ألا يتجاوز 70 حرف");
        v.max_len(
            self.meta_description.as_deref(),
            160,
            "وصف SEO يجب ألا يتجاوز 160 حرف",
        );
        v.finish()
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    #[default]
    TextImage,
    FeaturesGrid,
    ProcessTimeline,
    FaqAccordion,
    BenefitsGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionItem {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: SectionKind,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_alt: Option<String>,
    #[serde(default)]
    pub items: Vec<SectionItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seo {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub og_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroStat {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hero {
    pub image: String,
    #[serde(default)]
    pub image_alt: Option<String>,
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub stats: Vec<HeroStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
}

fn default_rating() -> u8 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Testimonial {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_rating")]
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

fn default_service_icon() -> String {
    "Wind".to_string()
}

/// A service landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default = "default_service_icon")]
    pub icon: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub breadcrumb: String,
    #[serde(default)]
    pub seo: Option<Seo>,
    #[serde(default)]
    pub hero: Option<Hero>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub cta: Option<Cta>,
    /// Schema.org blobs are stored as-is.
    #[serde(default)]
    pub schema_org: Option<serde_json::Value>,
    #[serde(default)]
    pub breadcrumb_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub product_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub testimonials: Vec<Testimonial>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub order: i64,
    /// Id of the owning [`Category`], if linked.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn service_normalize(service: &mut Service, _: &Changes, _: DateTime<Utc>) {
    service.slug = derive_slug(&service.slug);
}

fn service_slug(service: &mut Service, changes: &Changes, _: DateTime<Utc>) {
    derive_slug_if_absent(&mut service.slug, &service.title, "title", changes);
}

impl Lifecycle for Service {
    fn hooks() -> &'static [Hook<Self>] {
        &[service_normalize, service_slug]
    }
}

impl Ordered for Service {
    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Entity for Service {
    const COLLECTION: &'static str = "services";
    const NOT_FOUND: &'static str = "الخدمة غير موجودة";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_identity(&mut self, id: String, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut v = Violations::default();
        v.require(&self.slug, "Slug مطلوب");
        v.require(&self.title, "عنوان الخدمة مطلوب");
        v.require(&self.subtitle, "الوصف المختصر مطلوب");
        if let Some(seo) = &self.seo {
            v.require(&seo.title, "عنوان SEO مطلوب");
            v.require(&seo.description, "وصف SEO مطلوب");
        }
        if let Some(hero) = &self.hero {
            v.require(&hero.image, "صورة القسم الرئيسي مطلوبة");
            v.require(&hero.description, "وصف القسم الرئيسي مطلوب");
        }
        for section in &self.sections {
            v.require(&section.id, "معرف القسم مطلوب");
            v.require(&section.title, "عنوان القسم مطلوب");
        }
        for testimonial in &self.testimonials {
            v.require(&testimonial.name, "اسم العميل مطلوب");
            v.require(&testimonial.comment, "التعليق مطلوب");
            v.check(
                (1..=5).contains(&testimonial.rating),
                "التقييم يجب أن يكون بين 1 و 5",
            );
        }
        v.finish()
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Service,
    Blog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryColor {
    #[serde(default = "default_primary_color")]
    pub primary: String,
    #[serde(default = "default_bg_color")]
    pub bg: String,
}

fn default_primary_color() -> String {
    "#3b82f6".to_string()
}

fn default_bg_color() -> String {
    "#eff6ff".to_string()
}

impl Default for CategoryColor {
    fn default() -> Self {
        Self {
            primary: default_primary_color(),
            bg: default_bg_color(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: CategoryColor,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn category_normalize(category: &mut Category, _: &Changes, _: DateTime<Utc>) {
    category.name = category.name.trim().to_string();
    category.slug = derive_slug(&category.slug);
}

fn category_slug(category: &mut Category, changes: &Changes, _: DateTime<Utc>) {
    derive_slug_if_absent(&mut category.slug, &category.name, "name", changes);
}

impl Lifecycle for Category {
    fn hooks() -> &'static [Hook<Self>] {
        &[category_normalize, category_slug]
    }
}

impl Ordered for Category {
    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Entity for Category {
    const COLLECTION: &'static str = "categories";
    const NOT_FOUND: &'static str = "القسم غير موجود";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_identity(&mut self, id: String, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut v = Violations::default();
        v.require(&self.name, "اسم القسم مطلوب");
        v.require(&self.slug, "الرابط مطلوب");
        v.finish()
    }
}

// ---------------------------------------------------------------------------
// FAQ
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqQuestion {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_faq_icon() -> String {
    "HelpCircle".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqCategory {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default = "default_faq_icon")]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<FaqQuestion>,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl FaqCategory {
    pub fn question_mut(&mut self, question_id: &str) -> Result<&mut FaqQuestion, AppError> {
        self.questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| AppError::NotFound("السؤال غير موجود".into()))
    }

    /// Keep only active questions, sorted by their display order.
    pub fn retain_active_questions(&mut self) {
        self.questions.retain(|q| q.is_active);
        self.questions.sort_by_key(|q| q.order);
    }
}

fn faq_normalize(faq: &mut FaqCategory, _: &Changes, _: DateTime<Utc>) {
    faq.name = faq.name.trim().to_string();
    faq.slug = derive_slug(&faq.slug);
    for question in faq.questions.iter_mut() {
        question.question = question.question.trim().to_string();
    }
}

fn faq_slug(faq: &mut FaqCategory, changes: &Changes, _: DateTime<Utc>) {
    // A renamed category follows its name unless the slug was set in the same write.
    let renamed = changes.contains("name") && !changes.contains("slug");
    if renamed || faq.slug.is_empty() {
        faq.slug = derive_slug(&faq.name);
    }
}

impl Lifecycle for FaqCategory {
    fn hooks() -> &'static [Hook<Self>] {
        &[faq_normalize, faq_slug]
    }
}

impl Ordered for FaqCategory {
    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Entity for FaqCategory {
    const COLLECTION: &'static str = "faqcategories";
    const NOT_FOUND: &'static str = "القسم غير موجود";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_identity(&mut self, id: String, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut v = Violations::default();
        v.require(&self.name, "اسم القسم مطلوب");
        for question in &self.questions {
            v.require(&question.question, "السؤال مطلوب");
            v.require(&question.answer, "الإجابة مطلوبة");
        }
        v.finish()
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// What a media asset is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelatedTo {
    Service { id: String },
    Blog { id: String },
    General,
}

/// Metadata of an uploaded file. The binary lives in blob storage under
/// `filename`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    /// Storage key of the final binary.
    pub filename: String,
    pub original_name: String,
    pub path: String,
    pub url: String,
    pub mimetype: String,
    /// Size of the stored bytes, after transcoding.
    pub size: u64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub related_to: Option<RelatedTo>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Lifecycle for Media {
    fn hooks() -> &'static [Hook<Self>] {
        &[]
    }
}

impl Entity for Media {
    const COLLECTION: &'static str = "media";
    const UNIQUE_FIELDS: &'static [&'static str] = &[];
    const NOT_FOUND: &'static str = "الملف غير موجود";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_identity(&mut self, id: String, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut v = Violations::default();
        v.require(&self.filename, "اسم الملف مطلوب");
        v.require(&self.url, "رابط الملف مطلوب");
        v.require(&self.mimetype, "نوع الملف مطلوب");
        v.finish()
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Editor,
}

/// A back-office account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    pub email: String,
    /// bcrypt hash; never returned by the API.
    pub password_hash: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn user_normalize(user: &mut User, _: &Changes, _: DateTime<Utc>) {
    user.email = user.email.trim().to_lowercase();
}

impl Lifecycle for User {
    fn hooks() -> &'static [Hook<Self>] {
        &[user_normalize]
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
    const UNIQUE_FIELDS: &'static [&'static str] = &["email"];
    const NOT_FOUND: &'static str = "المستخدم غير موجود";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_identity(&mut self, id: String, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut v = Violations::default();
        v.require(&self.email, "البريد الإلكتروني مطلوب");
        v.require(&self.password_hash, "كلمة المرور مطلوبة");
        v.finish()
    }
}
