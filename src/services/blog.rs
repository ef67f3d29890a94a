use sqlx::PgPool;
use uuid::Uuid;

use crate::models::blog::{BlogPost, CreateBlogPostRequest, UpdateBlogPostRequest};

/// URL slug with Turkish letters folded to ASCII:
/// "Bel Ağrısı ve Egzersiz" → "bel-agrisi-ve-egzersiz".
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        let folded = match ch {
            'ç' => 'c',
            'ğ' => 'g',
            'ı' | 'î' => 'i',
            'ö' => 'o',
            'ş' => 's',
            'ü' | 'û' => 'u',
            'â' => 'a',
            // Lowercasing 'İ' yields 'i' + U+0307.
            '\u{307}' => continue,
            c => c,
        };
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }
    slug
}

pub struct BlogService;

impl BlogService {
    pub async fn list_published(pool: &PgPool) -> anyhow::Result<Vec<BlogPost>> {
        let posts = sqlx::query_as::<_, BlogPost>(
            "SELECT * FROM blog_posts WHERE published = TRUE ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(posts)
    }

    pub async fn list_all(pool: &PgPool) -> anyhow::Result<Vec<BlogPost>> {
        let posts = sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
        Ok(posts)
    }

    pub async fn get_published_by_slug(pool: &PgPool, slug: &str) -> anyhow::Result<Option<BlogPost>> {
        let post = sqlx::query_as::<_, BlogPost>(
            "SELECT * FROM blog_posts WHERE slug = $1 AND published = TRUE",
        )
        .bind(slug)
        .fetch_optional(pool)
        .await?;
        Ok(post)
    }

    pub async fn create(pool: &PgPool, req: &CreateBlogPostRequest) -> anyhow::Result<BlogPost> {
        let slug = match req.slug.as_deref().map(slugify).filter(|s| !s.is_empty()) {
            Some(s) => s,
            None => slugify(&req.title),
        };
        if slug.is_empty() {
            anyhow::bail!("Başlıktan geçerli bir bağlantı oluşturulamadı");
        }

        let post = sqlx::query_as::<_, BlogPost>(
            "INSERT INTO blog_posts
                (title, slug, excerpt, content, cover_image, category, author, published)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(&req.title)
        .bind(&slug)
        .bind(&req.excerpt)
        .bind(&req.content)
        .bind(&req.cover_image)
        .bind(&req.category)
        .bind(&req.author)
        .bind(req.published)
        .fetch_one(pool)
        .await?;
        Ok(post)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateBlogPostRequest,
    ) -> anyhow::Result<Option<BlogPost>> {
        let slug = req.slug.as_deref().map(slugify).filter(|s| !s.is_empty());
        let post = sqlx::query_as::<_, BlogPost>(
            "UPDATE blog_posts
             SET title       = COALESCE($1, title),
                 slug        = COALESCE($2, slug),
                 excerpt     = COALESCE($3, excerpt),
                 content     = COALESCE($4, content),
                 cover_image = COALESCE($5, cover_image),
                 category    = COALESCE($6, category),
                 author      = COALESCE($7, author),
                 published   = COALESCE($8, published),
                 updated_at  = NOW()
             WHERE id = $9
             RETURNING *",
        )
        .bind(&req.title)
        .bind(slug)
        .bind(&req.excerpt)
        .bind(&req.content)
        .bind(&req.cover_image)
        .bind(&req.category)
        .bind(&req.author)
        .bind(req.published)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(post)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn folds_turkish_letters() {
        assert_eq!(slugify("Bel Ağrısı ve Egzersiz"), "bel-agrisi-ve-egzersiz");
        assert_eq!(slugify("ÇOCUKLARDA SKOLYOZ"), "cocuklarda-skolyoz");
        assert_eq!(slugify("İyileşme Süreci"), "iyilesme-sureci");
    }

    #[test]
    fn collapses_punctuation_and_trims_dashes() {
        assert_eq!(slugify("  Diz --- Ağrısı?! (2024) "), "diz-agrisi-2024");
        assert_eq!(slugify("!!!"), "");
    }
}
