//! Poster template models.

use serde::{Deserialize, Serialize};

/// A poster template that users can star in.
///
/// `images` is ordered most-recent-first and `cover_image` mirrors
/// `images[0]` after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawTemplate")]
pub struct Template {
    pub id: String,
    pub title: String,
    pub category: String,
    pub cover_image: String,
    pub images: Vec<String>,
    /// Default poster title shown in the customize form
    pub movie_title: String,
    /// Costume the generated character should wear
    pub costume: String,
}

impl Template {
    /// Make `url` the newest image and the cover.
    pub fn push_image(&mut self, url: impl Into<String>) {
        let url = url.into();
        self.images.insert(0, url.clone());
        self.cover_image = url;
    }
}

/// On-disk shape; `images` may be missing or malformed in older registries.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTemplate {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    cover_image: String,
    #[serde(default)]
    images: Option<serde_json::Value>,
    #[serde(default)]
    movie_title: String,
    #[serde(default)]
    costume: String,
}

impl From<RawTemplate> for Template {
    fn from(raw: RawTemplate) -> Self {
        let images = match raw.images {
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ if raw.cover_image.is_empty() => Vec::new(),
            _ => vec![raw.cover_image.clone()],
        };

        Self {
            id: raw.id,
            title: raw.title,
            category: raw.category,
            cover_image: raw.cover_image,
            images,
            movie_title: raw.movie_title,
            costume: raw.costume,
        }
    }
}

fn seed(
    id: &str,
    title: &str,
    category: &str,
    cover_image: &str,
    movie_title: &str,
    costume: &str,
) -> Template {
    Template {
        id: id.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        cover_image: cover_image.to_string(),
        images: vec![cover_image.to_string()],
        movie_title: movie_title.to_string(),
        costume: costume.to_string(),
    }
}

/// Templates used when no registry file exists yet.
pub fn seed_templates() -> Vec<Template> {
    vec![
        seed(
            "terminator",
            "The Terminator",
            "Sci-Fi",
            "https://image.tmdb.org/t/p/original/qvktm0BHcnmDpul4Hz01GIazWPr.jpg",
            "THE TERMINATOR",
            "a leather jacket, sunglasses, and a robotic eye",
        ),
        seed(
            "good_bad_ugly",
            "The Good, The Bad & The Ugly",
            "Action",
            "https://image.tmdb.org/t/p/original/bX2xnavhMYjWDoZp1VM6VnU1xwe.jpg",
            "THE GOOD, THE BAD & THE UGLY",
            "a cowboy hat, dusty poncho, and cigarillo",
        ),
        seed(
            "cool_runnings",
            "Cool Runnings",
            "Comedy",
            "https://image.tmdb.org/t/p/original/qN6H0LgqX7Xb4.jpg",
            "COOL RUNNINGS",
            "a Jamaican bobsled team uniform or colorful spandex suit",
        ),
        seed(
            "matrix",
            "The Matrix",
            "Sci-Fi",
            "https://image.tmdb.org/t/p/original/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg",
            "THE MATRIX",
            "a long black leather trench coat and dark sunglasses",
        ),
        seed(
            "superman",
            "Superman",
            "Action",
            "https://image.tmdb.org/t/p/original/d7px1FQxZB4lsVBSWF4.jpg",
            "SUPERMAN",
            "a blue superhero suit with a red cape and S shield",
        ),
        seed(
            "spiderman",
            "Spider-Man",
            "Action",
            "https://image.tmdb.org/t/p/original/gh4cZbhZxyTbgx.jpg",
            "SPIDER-MAN",
            "a red and blue spider superhero suit",
        ),
        seed(
            "airplane",
            "Airplane!",
            "Comedy",
            "https://image.tmdb.org/t/p/original/z4x0Kn.jpg",
            "AIRPLANE!",
            "a retro airline pilot uniform or stewardess outfit",
        ),
        seed(
            "sgt_pepper",
            "Sgt. Pepper's Band",
            "Musical",
            "https://upload.wikimedia.org/wikipedia/en/1/17/Sgt._Pepper%27s_Lonely_Hearts_Club_Band_%28film%29_poster.jpg",
            "SGT. PEPPER'S BAND",
            "a colorful satin marching band uniform with epaulettes",
        ),
    ]
}
