use crate::player::Track;

/// Where the value of an MPD tag comes from.
#[derive(Clone, Copy, Debug)]
pub enum TagSource {
    Tag(&'static str),
    Year,
    Basename,
}

/// MPD tag names in the order they are reported by `tagtypes` and in song
/// blocks.
pub const TAG_MAPPING: &[(&str, TagSource)] = &[
    ("Artist", TagSource::Tag("artist")),
    ("ArtistSort", TagSource::Tag("artistsort")),
    ("Album", TagSource::Tag("album")),
    ("AlbumArtist", TagSource::Tag("albumartist")),
    ("AlbumArtistSort", TagSource::Tag("albumartistsort")),
    ("Title", TagSource::Tag("title")),
    ("Track", TagSource::Tag("tracknumber")),
    ("Genre", TagSource::Tag("genre")),
    ("Date", TagSource::Year),
    ("Composer", TagSource::Tag("composer")),
    ("Performer", TagSource::Tag("performer")),
    ("Comment", TagSource::Tag("comment")),
    ("Disc", TagSource::Tag("discnumber")),
    ("Name", TagSource::Basename),
    ("MUSICBRAINZ_ARTISTID", TagSource::Tag("musicbrainz_artistid")),
    ("MUSICBRAINZ_ALBUMID", TagSource::Tag("musicbrainz_albumid")),
    (
        "MUSICBRAINZ_ALBUMARTISTID",
        TagSource::Tag("musicbrainz_albumartistid"),
    ),
    ("MUSICBRAINZ_TRACKID", TagSource::Tag("musicbrainz_trackid")),
];

impl TagSource {
    fn value(self, track: &Track) -> Option<String> {
        match self {
            TagSource::Tag(key) => track.tag(key),
            TagSource::Year => track.year(),
            TagSource::Basename => track.basename(),
        }
    }
}

/// One `<Name>: <value>` line per populated tag.
pub fn format_tags(track: &Track) -> Vec<String> {
    TAG_MAPPING
        .iter()
        .filter_map(|(name, source)| {
            source
                .value(track)
                .map(|value| format!("{}: {}", name, value))
        })
        .collect()
}
