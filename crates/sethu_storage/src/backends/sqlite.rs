use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sethu_core::{Doctor, Error, Lead, Result, ScrapeStatus, ScrapedPost, SiteStorage, Story, StorySubmission};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS clinic_leads (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        phone TEXT NOT NULL,
        age INTEGER NOT NULL,
        gender TEXT NOT NULL,
        problem_type TEXT NOT NULL,
        source TEXT NOT NULL,
        priority TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stories (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        submission TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scraped_posts (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        source_url TEXT NOT NULL UNIQUE,
        source_site TEXT NOT NULL,
        slug TEXT NOT NULL,
        title TEXT NOT NULL,
        excerpt TEXT,
        content_html TEXT NOT NULL,
        image_url TEXT,
        content_hash TEXT NOT NULL,
        scraped_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS doctors (
        source_site TEXT NOT NULL,
        slug TEXT NOT NULL,
        name TEXT NOT NULL,
        designation TEXT,
        specialties TEXT NOT NULL,
        qualifications TEXT,
        experience_years INTEGER,
        languages TEXT NOT NULL,
        location TEXT,
        image_url TEXT,
        profile_url TEXT NOT NULL,
        about_html TEXT,
        content_hash TEXT NOT NULL,
        scraped_at TEXT NOT NULL,
        PRIMARY KEY (source_site, slug)
    )
    "#,
];

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Storage(format!("{}: {}", context, e))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("bad timestamp {:?}: {}", raw, e)))
}

pub struct SQLiteStorage {
    pool: SqlitePool,
}

impl SQLiteStorage {
    /// Connects to a `sqlite:` URL, creating the database when missing.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(db_error("Invalid database url"))?
            .create_if_missing(true);
        Self::connect(options).await
    }

    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new().filename(db_path).create_if_missing(true);
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }
        tracing::debug!("SQLite storage ready ({} migrations)", MIGRATIONS.len());

        Ok(Self { pool })
    }

    async fn stored_hash(&self, sql: &str, keys: &[&str]) -> Result<Option<String>> {
        let mut query = sqlx::query_scalar::<_, String>(sql);
        for key in keys {
            query = query.bind(*key);
        }
        query
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to read content hash"))
    }
}

fn lead_from_row(row: &SqliteRow) -> Result<Lead> {
    let created_at: String = row.get("created_at");
    Ok(Lead {
        id: row.get("id"),
        name: row.get("name"),
        phone: row.get("phone"),
        age: row.get::<i64, _>("age") as u32,
        gender: row.get("gender"),
        problem_type: row.get("problem_type"),
        source: row.get("source"),
        priority: row.get("priority"),
        status: row.get("status"),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn post_from_row(row: &SqliteRow) -> Result<ScrapedPost> {
    let scraped_at: String = row.get("scraped_at");
    Ok(ScrapedPost {
        source_site: row.get("source_site"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content_html: row.get("content_html"),
        image_url: row.get("image_url"),
        source_url: row.get("source_url"),
        content_hash: row.get("content_hash"),
        scraped_at: parse_timestamp(&scraped_at)?,
    })
}

fn doctor_from_row(row: &SqliteRow) -> Result<Doctor> {
    let specialties: String = row.get("specialties");
    let languages: String = row.get("languages");
    let scraped_at: String = row.get("scraped_at");
    Ok(Doctor {
        source_site: row.get("source_site"),
        slug: row.get("slug"),
        name: row.get("name"),
        designation: row.get("designation"),
        specialties: serde_json::from_str(&specialties)?,
        qualifications: row.get("qualifications"),
        experience_years: row.get::<Option<i64>, _>("experience_years").map(|y| y as u32),
        languages: serde_json::from_str(&languages)?,
        location: row.get("location"),
        image_url: row.get("image_url"),
        profile_url: row.get("profile_url"),
        about_html: row.get("about_html"),
        content_hash: row.get("content_hash"),
        scraped_at: parse_timestamp(&scraped_at)?,
    })
}

#[async_trait]
impl SiteStorage for SQLiteStorage {
    async fn store_lead(&self, lead: &Lead) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clinic_leads
            (id, name, phone, age, gender, problem_type, source, priority, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&lead.id)
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(lead.age as i64)
        .bind(&lead.gender)
        .bind(&lead.problem_type)
        .bind(&lead.source)
        .bind(&lead.priority)
        .bind(&lead.status)
        .bind(lead.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store lead"))?;
        Ok(())
    }

    async fn list_leads(&self) -> Result<Vec<Lead>> {
        let rows = sqlx::query("SELECT * FROM clinic_leads ORDER BY seq DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list leads"))?;
        rows.iter().map(lead_from_row).collect()
    }

    async fn store_story(&self, story: &Story) -> Result<()> {
        let submission = serde_json::to_string(&story.submission)?;
        sqlx::query("INSERT INTO stories (id, submission, created_at) VALUES (?, ?, ?)")
            .bind(&story.id)
            .bind(submission)
            .bind(story.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to store story"))?;
        Ok(())
    }

    async fn list_stories(&self) -> Result<Vec<Story>> {
        let rows = sqlx::query("SELECT id, submission, created_at FROM stories ORDER BY seq DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list stories"))?;

        let mut stories = Vec::with_capacity(rows.len());
        for row in rows {
            let submission: String = row.get("submission");
            let created_at: String = row.get("created_at");
            stories.push(Story {
                id: row.get("id"),
                submission: serde_json::from_str::<StorySubmission>(&submission)?,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(stories)
    }

    async fn upsert_post(&self, post: &ScrapedPost) -> Result<ScrapeStatus> {
        let previous = self
            .stored_hash("SELECT content_hash FROM scraped_posts WHERE source_url = ?", &[post.source_url.as_str()])
            .await?;
        let status = ScrapeStatus::from_hashes(previous.as_deref(), &post.content_hash);

        let sql = match status {
            ScrapeStatus::Unchanged => return Ok(status),
            ScrapeStatus::New => {
                r#"
                INSERT INTO scraped_posts
                (source_site, slug, title, excerpt, content_html, image_url, content_hash, scraped_at, source_url)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#
            }
            ScrapeStatus::Updated => {
                r#"
                UPDATE scraped_posts
                SET source_site = ?, slug = ?, title = ?, excerpt = ?, content_html = ?,
                    image_url = ?, content_hash = ?, scraped_at = ?
                WHERE source_url = ?
                "#
            }
        };

        sqlx::query(sql)
            .bind(&post.source_site)
            .bind(&post.slug)
            .bind(&post.title)
            .bind(post.excerpt.as_deref())
            .bind(&post.content_html)
            .bind(post.image_url.as_deref())
            .bind(&post.content_hash)
            .bind(post.scraped_at.to_rfc3339())
            .bind(&post.source_url)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to upsert post"))?;
        Ok(status)
    }

    async fn list_posts(&self, limit: usize, offset: usize) -> Result<Vec<ScrapedPost>> {
        let rows = sqlx::query("SELECT * FROM scraped_posts ORDER BY seq DESC LIMIT ? OFFSET ?")
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list posts"))?;
        rows.iter().map(post_from_row).collect()
    }

    async fn get_post(&self, slug: &str) -> Result<Option<ScrapedPost>> {
        let row = sqlx::query("SELECT * FROM scraped_posts WHERE slug = ? LIMIT 1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get post"))?;
        row.as_ref().map(post_from_row).transpose()
    }

    async fn upsert_doctor(&self, doctor: &Doctor) -> Result<ScrapeStatus> {
        let previous = self
            .stored_hash(
                "SELECT content_hash FROM doctors WHERE source_site = ? AND slug = ?",
                &[doctor.source_site.as_str(), doctor.slug.as_str()],
            )
            .await?;
        let status = ScrapeStatus::from_hashes(previous.as_deref(), &doctor.content_hash);
        if status == ScrapeStatus::Unchanged {
            return Ok(status);
        }

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO doctors
            (source_site, slug, name, designation, specialties, qualifications, experience_years,
             languages, location, image_url, profile_url, about_html, content_hash, scraped_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doctor.source_site)
        .bind(&doctor.slug)
        .bind(&doctor.name)
        .bind(doctor.designation.as_deref())
        .bind(serde_json::to_string(&doctor.specialties)?)
        .bind(doctor.qualifications.as_deref())
        .bind(doctor.experience_years.map(|y| y as i64))
        .bind(serde_json::to_string(&doctor.languages)?)
        .bind(doctor.location.as_deref())
        .bind(doctor.image_url.as_deref())
        .bind(&doctor.profile_url)
        .bind(doctor.about_html.as_deref())
        .bind(&doctor.content_hash)
        .bind(doctor.scraped_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to upsert doctor"))?;
        Ok(status)
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let rows = sqlx::query("SELECT * FROM doctors ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list doctors"))?;
        rows.iter().map(doctor_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sethu_core::LeadSubmission;
    use tempfile::tempdir;

    fn post(slug: &str, hash: &str) -> ScrapedPost {
        ScrapedPost {
            source_site: "medcyivf.in".to_string(),
            slug: slug.to_string(),
            title: "Understanding AMH".to_string(),
            excerpt: Some("What the number means".to_string()),
            content_html: "<p>AMH is a hormone.</p>".to_string(),
            image_url: None,
            source_url: format!("https://medcyivf.in/blog/{}", slug),
            content_hash: hash.to_string(),
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("sethu.db")).await.unwrap();

        assert_eq!(storage.upsert_post(&post("amh", "1")).await.unwrap(), ScrapeStatus::New);
        assert_eq!(storage.upsert_post(&post("amh", "1")).await.unwrap(), ScrapeStatus::Unchanged);
        assert_eq!(storage.upsert_post(&post("amh", "2")).await.unwrap(), ScrapeStatus::Updated);
        storage.upsert_post(&post("pcos", "3")).await.unwrap();

        let posts = storage.list_posts(10, 0).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].slug, "pcos");
        assert_eq!(storage.get_post("amh").await.unwrap().unwrap().content_hash, "2");

        let lead = Lead::try_from(LeadSubmission {
            name: "Kavya".into(),
            phone: "9000000000".into(),
            age: "29".into(),
            gender: "Female".into(),
            problem_type: "Male infertility".into(),
            source: "Instagram".into(),
        })
        .unwrap();
        storage.store_lead(&lead).await.unwrap();
        assert_eq!(storage.list_leads().await.unwrap(), vec![lead]);

        let story = Story::try_from(StorySubmission {
            name: "Lakshmi".into(),
            message_to_others: "Keep going".into(),
            selected_emotions: vec!["hope".into()],
            ..Default::default()
        })
        .unwrap();
        storage.store_story(&story).await.unwrap();
        assert_eq!(storage.list_stories().await.unwrap()[0].submission.name, "Lakshmi");
    }

    #[tokio::test]
    async fn test_doctor_upsert() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("sethu.db")).await.unwrap();

        let mut doctor = Doctor {
            source_site: "medcyivf.in".to_string(),
            slug: "dr-padmaja".to_string(),
            name: "Dr. Padmaja".to_string(),
            designation: Some("Fertility Specialist".to_string()),
            specialties: vec!["IVF".to_string()],
            qualifications: Some("MBBS | MS (OBG)".to_string()),
            experience_years: Some(15),
            languages: vec!["Telugu".to_string()],
            location: None,
            image_url: None,
            profile_url: "https://medcyivf.in/doctors/dr-padmaja".to_string(),
            about_html: None,
            content_hash: "a".to_string(),
            scraped_at: Utc::now(),
        };
        assert_eq!(storage.upsert_doctor(&doctor).await.unwrap(), ScrapeStatus::New);
        doctor.content_hash = "b".to_string();
        assert_eq!(storage.upsert_doctor(&doctor).await.unwrap(), ScrapeStatus::Updated);

        let doctors = storage.list_doctors().await.unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].specialties, vec!["IVF".to_string()]);
        assert_eq!(doctors[0].experience_years, Some(15));
    }
}
