pub mod m3u;
pub mod series;

pub use m3u::{
    GROUP_ALL, GROUP_DUBBED, GROUP_SUBTITLED, PlaylistBuilder, PlaylistEntry, StreamHeaders,
    StreamItem, write_playlist,
};
pub use series::{
    DEFAULT_SERIES_GROUP, EpisodeItem, MASTER_PLAYLIST_FILE, SubtitleTrack, generated_at,
    render_master_playlist, render_series_playlist, series_file_name, write_series_playlists,
};
