//! The concrete layouts of the osu! database files, as declarative schema
//! data consumed by the walker.
//!
//! See <https://github.com/ppy/osu-wiki/blob/master/wiki/Client/File_formats/db_%28file_format%29/en.md>
//! for the documented field lists. Version bounds use the client's
//! `YYYYMMDD` release numbers; the difficulty fields changed width in the
//! 20140609 release. Counts that precede every repeated group are explicit
//! fields here, linked to their group when the schema is built.
//!
//! Schemas are process-lifetime statics; building them cannot fail unless
//! the tables below are edited inconsistently, so construction panics
//! instead of returning an error.

use std::sync::{Arc, LazyLock};

use crate::schema::{Field, FieldKind, Schema};

/// A star-rating entry: a tagged mod combination and its star value.
pub static INT_DOUBLE_PAIR: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("IntDoublePair")
        .field(Field::uint("IntTag", 1))
        .field(Field::uint("IntValue", 4))
        .field(Field::uint("DoubleTag", 1))
        .field(Field::float("DoubleValue", 8))
        .build()
        .expect("IntDoublePair schema")
});

pub static TIMING_POINT: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("TimingPoint")
        .field(Field::float("BPM", 8))
        .field(Field::float("OffsetMsec", 8))
        .field(Field::boolean("IsInherited"))
        .build()
        .expect("TimingPoint schema")
});

/// One beatmap entry of `osu!.db`. Gated by the outer file's version: the
/// byte-width difficulty fields were replaced by floats, and the per-mode
/// star-rating groups appeared, in release 20140609.
pub static BEATMAP: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("BeatMap")
        .field(Field::uint("SizeOfBeatmapBytes", 4))
        .field(Field::text("ArtistName"))
        .field(Field::text("ArtistNameUnicode"))
        .field(Field::text("SongTitle"))
        .field(Field::text("SongTitleUnicode"))
        .field(Field::text("CreatorName"))
        .field(Field::text("Difficulty"))
        .field(Field::text("AudioFileName"))
        .field(Field::text("Md5"))
        .field(Field::text("OsuFileName"))
        .field(Field::uint("RankedStatus", 1))
        .field(Field::uint("NumHitCircles", 2))
        .field(Field::uint("NumOfSliders", 2))
        .field(Field::uint("NumOfSpinners", 2))
        .field(Field::uint("LastModTimeTicks", 8))
        .field(Field::uint("ApproachRateOld", 1).until(20140609))
        .field(Field::uint("CircleSizeOld", 1).until(20140609))
        .field(Field::uint("HPDrainRateOld", 1).until(20140609))
        .field(Field::uint("OverallDifficultyOld", 1).until(20140609))
        .field(Field::float("ApproachRate", 4).since(20140609))
        .field(Field::float("CircleSize", 4).since(20140609))
        .field(Field::float("HPDrainRate", 4).since(20140609))
        .field(Field::float("OverallDifficulty", 4).since(20140609))
        .field(Field::float("SliderVelocity", 8))
        .counted(
            "NumOsuStandardStarRatings",
            Field::group(
                "OsuStandardStarRating",
                FieldKind::record_of(&INT_DOUBLE_PAIR),
            )
            .since(20140609),
        )
        .counted(
            "NumTaikoStarRatings",
            Field::group("TaikoStarRating", FieldKind::record_of(&INT_DOUBLE_PAIR))
                .since(20140609),
        )
        .counted(
            "NumCTBStarRatings",
            Field::group("CTBStarRating", FieldKind::record_of(&INT_DOUBLE_PAIR))
                .since(20140609),
        )
        .counted(
            "NumManiaStarRatings",
            Field::group("ManiaStarRating", FieldKind::record_of(&INT_DOUBLE_PAIR))
                .since(20140609),
        )
        .field(Field::uint("DrainTimeSecs", 4))
        .field(Field::uint("TotalTimeMsec", 4))
        .field(Field::uint("AudioPreviewMsec", 4))
        .counted(
            "NumTimingPoints",
            Field::group("TimingPoints", FieldKind::record_of(&TIMING_POINT)),
        )
        .field(Field::uint("BeatmapID", 4))
        .field(Field::uint("BeatmapSetID", 4))
        .field(Field::uint("ThreadID", 4))
        .field(Field::uint("GradeOsuStandard", 1))
        .field(Field::uint("GradeTaiko", 1))
        .field(Field::uint("GradeCTB", 1))
        .field(Field::uint("GradeMania", 1))
        .field(Field::uint("LocalBeatmapOffset", 2))
        .field(Field::float("StackLeniency", 4))
        .field(Field::uint("OsuGameplayMode", 1))
        .field(Field::text("SongSource"))
        .field(Field::text("SongTags"))
        .field(Field::uint("OnlineOffset", 2))
        .field(Field::text("TitleFont"))
        .field(Field::boolean("IsPlayed"))
        .field(Field::uint("LastTimePlayed", 8))
        .field(Field::boolean("IsOsz2Format"))
        .field(Field::text("RelativeFolderName"))
        .field(Field::uint("LastTimeCheckedWithRepo", 8))
        .field(Field::boolean("IgnoreBeatmapSound"))
        .field(Field::boolean("IgnoreBeatmapSkin"))
        .field(Field::boolean("DisableStoryboard"))
        .field(Field::boolean("DisableVideo"))
        .field(Field::boolean("VisualOverride"))
        .field(Field::uint("UnknownShort", 2).until(20140609))
        .field(Field::uint("LastModificationTime", 4))
        .field(Field::uint("ManiaScrollSpeed", 1))
        .build()
        .expect("BeatMap schema")
});

/// `osu!.db`: the client's local beatmap cache.
pub static OSU_DB: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("OsuDb")
        .version("Version")
        .field(Field::uint("FolderCount", 4))
        .field(Field::boolean("AccountUnlocked"))
        .field(Field::uint("Datetime", 8))
        .field(Field::text("PlayerName"))
        .counted(
            "NumBeatmaps",
            Field::group("Beatmaps", FieldKind::inherited_record(&BEATMAP)),
        )
        .field(Field::uint("UserPermissions", 4))
        .build()
        .expect("OsuDb schema")
});

pub static COLLECTION_ELEMENT: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("CollectionDbElement")
        .field(Field::text("Name"))
        .counted(
            "NumBeatmapMd5Hashes",
            Field::group("BeatmapMd5Hashes", FieldKind::Str),
        )
        .build()
        .expect("CollectionDbElement schema")
});

/// `collection.db`: named collections of beatmap hashes.
pub static COLLECTION_DB: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("CollectionDb")
        .version("Version")
        .counted(
            "NumCollections",
            Field::group("Collections", FieldKind::record_of(&COLLECTION_ELEMENT)),
        )
        .build()
        .expect("CollectionDb schema")
});

/// One play. `Version` here is the score's own release number, not a
/// version carrier; nothing in this layout is gated by it.
pub static SCORE: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("Score")
        .field(Field::uint("GameplayMode", 1))
        .field(Field::uint("Version", 4))
        .field(Field::text("Md5Hash"))
        .field(Field::text("PlayerName"))
        .field(Field::text("ReplayMd5Hash"))
        .field(Field::uint("Num300", 2))
        .field(Field::uint("Num200", 2))
        .field(Field::uint("Num50", 2))
        .field(Field::uint("NumMax300", 2))
        .field(Field::uint("Num100", 2))
        .field(Field::uint("NumMiss", 2))
        .field(Field::uint("ReplayScore", 4))
        .field(Field::uint("MaxCombo", 2))
        .field(Field::boolean("IsPerfectCombo"))
        .field(Field::uint("Mods", 4))
        .field(Field::text("Unknown"))
        .field(Field::uint("TimestampOfReplayWindowTicks", 8))
        .field(Field::uint("AlwaysNegativeOne", 4))
        .field(Field::uint("OnlineScoreId", 8))
        .build()
        .expect("Score schema")
});

pub static SCORES_BEATMAP: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("ScoresDbBeatMap")
        .field(Field::text("Md5Hash"))
        .counted(
            "NumScores",
            Field::group("Scores", FieldKind::record_of(&SCORE)),
        )
        .build()
        .expect("ScoresDbBeatMap schema")
});

/// `scores.db`: local scores grouped per beatmap.
pub static SCORES_DB: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("ScoresDb")
        .version("Version")
        .counted(
            "NumBeatmaps",
            Field::group("Beatmaps", FieldKind::record_of(&SCORES_BEATMAP)),
        )
        .build()
        .expect("ScoresDb schema")
});

pub static PLAYER_PRESENCE: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("PlayerPresence")
        .field(Field::uint("PlayerId", 4))
        .field(Field::text("PlayerName"))
        .field(Field::uint("UtcOffset", 1))
        .field(Field::uint("Country", 1))
        .field(Field::uint("UnknownByteField", 1))
        .field(Field::float("Longitude", 4))
        .field(Field::float("Latitude", 4))
        .field(Field::uint("GlobalRank", 4))
        .field(Field::uint("DateModified", 8))
        .build()
        .expect("PlayerPresence schema")
});

/// `presence.db`: the last seen state of other players.
pub static PRESENCE_DB: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("PresenceDb")
        .version("Version")
        .counted(
            "NumPlayers",
            Field::group("Players", FieldKind::record_of(&PLAYER_PRESENCE)),
        )
        .build()
        .expect("PresenceDb schema")
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{ReadRecord, WriteRecord};
    use crate::value::{Record, Value};
    use rand::Rng;

    const NEW_VERSION: u64 = 20180502;
    const OLD_VERSION: u64 = 20140101;

    fn md5_like(rng: &mut impl Rng) -> String {
        const HEX: &[u8] = b"0123456789abcdef";
        (0..32)
            .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
            .collect()
    }

    fn star_rating(rng: &mut impl Rng) -> Value {
        let mut pair = Record::new(&INT_DOUBLE_PAIR);
        pair.set("IntTag", Value::UInt(0x08));
        pair.set("IntValue", Value::UInt(rng.random_range(0..1024u64)));
        pair.set("DoubleTag", Value::UInt(0x0d));
        pair.set("DoubleValue", Value::Float(rng.random::<f64>() * 10.0));
        Value::Record(pair)
    }

    fn timing_point(rng: &mut impl Rng) -> Value {
        let mut tp = Record::new(&TIMING_POINT);
        tp.set("BPM", Value::Float(rng.random_range(60.0..240.0)));
        tp.set("OffsetMsec", Value::Float(rng.random_range(0.0..90_000.0)));
        tp.set("IsInherited", Value::Bool(rng.random()));
        Value::Record(tp)
    }

    fn beatmap(rng: &mut impl Rng, version: u64) -> Value {
        let mut b = Record::new(&BEATMAP);
        b.set("SizeOfBeatmapBytes", Value::UInt(rng.random_range(0..50_000u64)));
        b.set("ArtistName", Value::str("Loituma"));
        b.set("SongTitle", Value::str("Ievan Polkka"));
        b.set("CreatorName", Value::str("mapper"));
        b.set("Difficulty", Value::str("Insane"));
        b.set("AudioFileName", Value::str("audio.mp3"));
        b.set("Md5", Value::str(md5_like(rng)));
        b.set("OsuFileName", Value::str("map.osu"));
        b.set("RankedStatus", Value::UInt(4));
        b.set("NumHitCircles", Value::UInt(rng.random_range(0..2000u64)));
        b.set("NumOfSliders", Value::UInt(rng.random_range(0..500u64)));
        b.set("LastModTimeTicks", Value::UInt(rng.random()));
        if version >= 20140609 {
            b.set("ApproachRate", Value::Float(f64::from(rng.random::<f32>() * 10.0)));
            b.set("CircleSize", Value::Float(4.0));
            b.set("HPDrainRate", Value::Float(6.5));
            b.set("OverallDifficulty", Value::Float(8.0));
            b.set(
                "OsuStandardStarRating",
                Value::Seq((0..3).map(|_| star_rating(rng)).collect()),
            );
            b.set("ManiaStarRating", Value::Seq(vec![star_rating(rng)]));
        } else {
            b.set("ApproachRateOld", Value::UInt(9));
            b.set("CircleSizeOld", Value::UInt(4));
            b.set("HPDrainRateOld", Value::UInt(6));
            b.set("OverallDifficultyOld", Value::UInt(8));
            b.set("UnknownShort", Value::UInt(0));
        }
        b.set("SliderVelocity", Value::Float(1.4));
        b.set("DrainTimeSecs", Value::UInt(95));
        b.set("TotalTimeMsec", Value::UInt(98_000));
        b.set("AudioPreviewMsec", Value::UInt(31_000));
        b.set(
            "TimingPoints",
            Value::Seq((0..rng.random_range(1..4)).map(|_| timing_point(rng)).collect()),
        );
        b.set("BeatmapID", Value::UInt(rng.random_range(1..4_000_000u64)));
        b.set("BeatmapSetID", Value::UInt(rng.random_range(1..2_000_000u64)));
        b.set("GradeOsuStandard", Value::UInt(3));
        b.set("StackLeniency", Value::Float(f64::from(0.7f32)));
        b.set("SongTags", Value::str("polka eurobeat"));
        b.set("IsPlayed", Value::Bool(true));
        b.set("LastTimePlayed", Value::UInt(rng.random()));
        b.set("RelativeFolderName", Value::str("123 Loituma - Ievan Polkka"));
        b.set("LastTimeCheckedWithRepo", Value::UInt(rng.random()));
        b.set("ManiaScrollSpeed", Value::UInt(0));
        Value::Record(b)
    }

    /// Encode, decode, compare, re-encode, compare bytes; the stream must be
    /// consumed exactly.
    fn assert_roundtrip(record: &Record) {
        let mut bytes = Vec::new();
        bytes.write_record(record).unwrap();

        let mut reader = bytes.as_slice();
        let loaded = reader.read_record(record.schema()).unwrap();
        assert!(reader.is_empty(), "trailing bytes left unconsumed");
        assert_eq!(*record, loaded);

        let mut reencoded = Vec::new();
        reencoded.write_record(&loaded).unwrap();
        assert_eq!(bytes, reencoded);
    }

    #[test]
    fn osu_db_roundtrip() {
        let mut rng = rand::rng();
        let mut db = Record::new(&OSU_DB);
        db.set("Version", Value::UInt(NEW_VERSION));
        db.set("FolderCount", Value::UInt(412));
        db.set("AccountUnlocked", Value::Bool(true));
        db.set("Datetime", Value::UInt(636_616_578_000_000_000));
        db.set("PlayerName", Value::str("cookiezi"));
        db.set(
            "Beatmaps",
            Value::Seq((0..5).map(|_| beatmap(&mut rng, NEW_VERSION)).collect()),
        );
        assert_roundtrip(&db);
    }

    #[test]
    fn osu_db_old_version_uses_byte_difficulties() {
        let mut rng = rand::rng();
        let mut db = Record::new(&OSU_DB);
        db.set("Version", Value::UInt(OLD_VERSION));
        db.set("PlayerName", Value::str("rrtyui"));
        db.set(
            "Beatmaps",
            Value::Seq(vec![beatmap(&mut rng, OLD_VERSION)]),
        );
        assert_roundtrip(&db);

        let mut bytes = Vec::new();
        bytes.write_record(&db).unwrap();
        let mut reader = bytes.as_slice();
        let loaded = reader.read_record(&OSU_DB).unwrap();
        let map = loaded.get("Beatmaps").unwrap().as_seq().unwrap()[0]
            .as_record()
            .unwrap();
        // The float fields never hit the wire at this version.
        assert_eq!(map.get("ApproachRate"), Some(&Value::Float(0.0)));
        assert_eq!(map.get("ApproachRateOld"), Some(&Value::UInt(9)));
        assert_eq!(map.get("OsuStandardStarRating"), Some(&Value::Seq(Vec::new())));
    }

    #[test]
    fn collection_db_roundtrip() {
        let mut rng = rand::rng();
        let mut collection = Record::new(&COLLECTION_ELEMENT);
        collection.set("Name", Value::str("farm maps"));
        collection.set(
            "BeatmapMd5Hashes",
            Value::Seq((0..7).map(|_| Value::str(md5_like(&mut rng))).collect()),
        );
        let mut empty = Record::new(&COLLECTION_ELEMENT);
        empty.set("Name", Value::str("empty"));

        let mut db = Record::new(&COLLECTION_DB);
        db.set("Version", Value::UInt(NEW_VERSION));
        db.set(
            "Collections",
            Value::Seq(vec![Value::Record(collection), Value::Record(empty)]),
        );
        assert_roundtrip(&db);
    }

    #[test]
    fn scores_db_roundtrip() {
        let mut rng = rand::rng();
        let mut score = Record::new(&SCORE);
        score.set("GameplayMode", Value::UInt(0));
        score.set("Version", Value::UInt(NEW_VERSION));
        score.set("Md5Hash", Value::str(md5_like(&mut rng)));
        score.set("PlayerName", Value::str("WhiteCat"));
        score.set("ReplayMd5Hash", Value::str(md5_like(&mut rng)));
        score.set("Num300", Value::UInt(1520));
        score.set("Num100", Value::UInt(12));
        score.set("Num50", Value::UInt(1));
        score.set("NumMiss", Value::UInt(0));
        score.set("ReplayScore", Value::UInt(72_345_678));
        score.set("MaxCombo", Value::UInt(2040));
        score.set("IsPerfectCombo", Value::Bool(false));
        score.set("Mods", Value::UInt(72)); // HD + DT
        score.set("TimestampOfReplayWindowTicks", Value::UInt(rng.random()));
        score.set("AlwaysNegativeOne", Value::UInt(0xffff_ffff));
        score.set("OnlineScoreId", Value::UInt(rng.random()));

        let mut map = Record::new(&SCORES_BEATMAP);
        map.set("Md5Hash", Value::str(md5_like(&mut rng)));
        map.set("Scores", Value::Seq(vec![Value::Record(score)]));

        let mut db = Record::new(&SCORES_DB);
        db.set("Version", Value::UInt(NEW_VERSION));
        db.set("Beatmaps", Value::Seq(vec![Value::Record(map)]));
        assert_roundtrip(&db);
    }

    #[test]
    fn presence_db_roundtrip() {
        let mut rng = rand::rng();
        let players = (0..4u64)
            .map(|i| {
                let mut p = Record::new(&PLAYER_PRESENCE);
                p.set("PlayerId", Value::UInt(1000 + i));
                p.set("PlayerName", Value::str(format!("player{i}")));
                p.set("UtcOffset", Value::UInt(9));
                p.set("Country", Value::UInt(111));
                p.set("Longitude", Value::Float(f64::from(rng.random::<f32>() * 180.0)));
                p.set("Latitude", Value::Float(f64::from(rng.random::<f32>() * 90.0)));
                p.set("GlobalRank", Value::UInt(rng.random_range(1..1_000_000u64)));
                p.set("DateModified", Value::UInt(rng.random()));
                Value::Record(p)
            })
            .collect();

        let mut db = Record::new(&PRESENCE_DB);
        db.set("Version", Value::UInt(NEW_VERSION));
        db.set("Players", Value::Seq(players));
        assert_roundtrip(&db);
    }

    #[test]
    fn randomized_roundtrips() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let version = if rng.random() { NEW_VERSION } else { OLD_VERSION };
            let mut db = Record::new(&OSU_DB);
            db.set("Version", Value::UInt(version));
            db.set("FolderCount", Value::UInt(rng.random_range(0..10_000u64)));
            db.set("AccountUnlocked", Value::Bool(rng.random()));
            db.set("PlayerName", Value::str(md5_like(&mut rng)));
            db.set(
                "Beatmaps",
                Value::Seq(
                    (0..rng.random_range(0..3))
                        .map(|_| beatmap(&mut rng, version))
                        .collect(),
                ),
            );
            assert_roundtrip(&db);
        }
    }

    #[test]
    fn catalog_schemas_build() {
        for schema in [&*OSU_DB, &*COLLECTION_DB, &*SCORES_DB, &*PRESENCE_DB] {
            assert!(schema.version_field().is_some(), "{}", schema.name());
        }
        assert_eq!(BEATMAP.fields().len(), 64);
    }
}
