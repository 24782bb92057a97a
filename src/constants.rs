pub const NAME_MAX_LENGTH: usize = 255;
pub const TITLE_MAX_LENGTH: usize = 255;
pub const LINK_MAX_LENGTH: usize = 255;
pub const EMAIL_MAX_LENGTH: usize = 255;
pub const PASSWORD_MIN_LENGTH: usize = 5;

/// `NUMERIC(5, 2)`: at most 999.99.
pub const PRICE_MAX_CENTS: i32 = 99_999;

pub const JSON_BODY_LIMIT: u64 = 64 * 1024;
pub const IMAGE_UPLOAD_LIMIT: u64 = 10 * 1024 * 1024;

pub const MEDIA_URL: &str = "/static/media/";
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

pub const IMAGE_FORMATS: &[(image::ImageFormat, &str)] = &[
    (image::ImageFormat::Png, "png"),
    (image::ImageFormat::Jpeg, "jpg"),
    (image::ImageFormat::Gif, "gif"),
    (image::ImageFormat::WebP, "webp"),
    (image::ImageFormat::Bmp, "bmp"),
];
