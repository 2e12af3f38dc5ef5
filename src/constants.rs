//! Shared constants used across the application.

/// User agent string sent with every listing request.
///
/// The gallery serves a stripped page to unknown clients, so this mirrors a
/// current desktop Chrome build.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Listing endpoint for minor galleries. `id` and `page` are appended as query parameters.
pub const DEFAULT_LISTING_URL: &str = "https://gall.dcinside.com/mgallery/board/lists/";

/// Origin that relative post links are resolved against.
pub const DEFAULT_SITE_ORIGIN: &str = "https://gall.dcinside.com";

pub const DEFAULT_GALLERY_ID: &str = "thesingularity";
pub const DEFAULT_GALLERY_NAME: &str = "특이점이 온다";

/// Korea Standard Time, the zone the forum renders its dates in.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

/// Nickname prefix the forum assigns to IP posters who did not pick a name.
pub const SEMI_ANONYMOUS_MARKER: &str = "ㅇㅇ";
