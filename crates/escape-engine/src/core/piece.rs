use std::{fmt, str::FromStr};

use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};

use super::BOARD_WIDTH;

/// A tetromino (piece) with a kind and a pose on the board.
///
/// Pieces are immutable - movement and rotation operations return new `Piece` instances.
/// Whether the result is a legal placement is up to the board (see
/// [`BitBoard::is_colliding`](super::bit_board::BitBoard::is_colliding)).
///
/// # Coordinate System
///
/// - The pose is the top-left corner of the shape's tight bounding box
/// - Row 0 is the top of the board, rows grow downward
/// - Rows above the board (negative `y`) are free space
///
/// # Example
///
/// ```
/// use escape_engine::{Piece, PieceKind};
///
/// let piece = Piece::new(PieceKind::T);
/// let moved = piece.left();
/// let rotated = moved.rotated();
/// assert_eq!(rotated.pose().rotation.index(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    kind: PieceKind,
    pose: Pose,
}

impl Piece {
    /// Creates a piece at its spawn pose: horizontally centred on row 0.
    #[must_use]
    pub fn new(kind: PieceKind) -> Self {
        let width = kind.shape(PieceRotation::SPAWN).width();
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let x = ((BOARD_WIDTH - width) / 2) as i8;
        Self {
            kind,
            pose: Pose::new(x, 0, PieceRotation::SPAWN),
        }
    }

    /// Creates a piece at the given pose, reducing the rotation to the kind's variant count.
    #[must_use]
    pub fn with_pose(kind: PieceKind, pose: Pose) -> Self {
        Self {
            kind,
            pose: Pose {
                rotation: kind.normalize(pose.rotation),
                ..pose
            },
        }
    }

    #[must_use]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    #[must_use]
    pub fn pose(&self) -> Pose {
        self.pose
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.kind.shape(self.pose.rotation)
    }

    /// Absolute `(x, y)` grid coordinates of the occupied cells.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + use<> {
        let x0 = i32::from(self.pose.x);
        let y0 = i32::from(self.pose.y);
        self.shape()
            .cells()
            .map(move |(dx, dy)| (x0 + dx, y0 + dy))
    }

    /// Row index just below the piece's bounding box.
    #[must_use]
    pub fn bottom(&self) -> i32 {
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let height = self.shape().height() as i32;
        i32::from(self.pose.y) + height
    }

    #[must_use]
    pub fn left(&self) -> Self {
        self.moved(self.pose.left())
    }

    #[must_use]
    pub fn right(&self) -> Self {
        self.moved(self.pose.right())
    }

    #[must_use]
    pub fn down(&self) -> Self {
        self.moved(self.pose.down())
    }

    /// Shifts the piece horizontally by `dx` cells.
    #[must_use]
    pub fn shifted(&self, dx: i8) -> Self {
        self.moved(Pose {
            x: self.pose.x + dx,
            ..self.pose
        })
    }

    /// Rotates to the next shape variant of this kind.
    #[must_use]
    pub fn rotated(&self) -> Self {
        self.with_rotation(self.pose.rotation.next(self.kind))
    }

    #[must_use]
    pub fn with_rotation(&self, rotation: PieceRotation) -> Self {
        self.moved(self.pose.with_rotation(self.kind.normalize(rotation)))
    }

    fn moved(&self, pose: Pose) -> Self {
        Self {
            kind: self.kind,
            pose,
        }
    }
}

impl fmt::Display for Piece {
    /// Format: `kind#rotation@x,y` (e.g. `S#1@4,18`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}@{},{}",
            self.kind.as_char(),
            self.pose.rotation.0,
            self.pose.x,
            self.pose.y
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid piece `{input}`: {reason}")]
pub struct ParsePieceError {
    input: String,
    reason: &'static str,
}

impl FromStr for Piece {
    type Err = ParsePieceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParsePieceError {
            input: s.to_owned(),
            reason,
        };
        let (kind, rest) = s.split_once('#').ok_or_else(|| err("missing '#'"))?;
        let (rotation, position) = rest.split_once('@').ok_or_else(|| err("missing '@'"))?;
        let (x, y) = position
            .split_once(',')
            .ok_or_else(|| err("missing ','"))?;

        let mut chars = kind.chars();
        let kind = match (chars.next(), chars.next()) {
            (Some(c), None) => PieceKind::from_char(c).ok_or_else(|| err("unknown piece kind"))?,
            _ => return Err(err("piece kind must be a single character")),
        };
        let rotation = rotation
            .parse::<u8>()
            .map_err(|_| err("invalid rotation"))?;
        if usize::from(rotation) >= kind.variant_count() {
            return Err(err("rotation out of range for piece kind"));
        }
        let x = x.parse::<i8>().map_err(|_| err("invalid x"))?;
        let y = y.parse::<i8>().map_err(|_| err("invalid y"))?;

        Ok(Piece::with_pose(kind, Pose::new(x, y, PieceRotation(rotation))))
    }
}

impl Serialize for Piece {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Piece {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Position and orientation of a piece: the search's state-space key.
///
/// Two poses are equal iff x, y and rotation all match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pose {
    pub x: i8,
    pub y: i8,
    pub rotation: PieceRotation,
}

impl Pose {
    #[must_use]
    pub const fn new(x: i8, y: i8, rotation: PieceRotation) -> Self {
        Self { x, y, rotation }
    }

    #[must_use]
    pub const fn left(self) -> Self {
        Self::new(self.x - 1, self.y, self.rotation)
    }

    #[must_use]
    pub const fn right(self) -> Self {
        Self::new(self.x + 1, self.y, self.rotation)
    }

    #[must_use]
    pub const fn down(self) -> Self {
        Self::new(self.x, self.y + 1, self.rotation)
    }

    #[must_use]
    pub const fn with_rotation(self, rotation: PieceRotation) -> Self {
        Self::new(self.x, self.y, rotation)
    }

    #[must_use]
    pub fn key(self) -> PoseKey {
        PoseKey::from(self)
    }
}

/// A [`Pose`] packed into a single integer.
///
/// Layout (LSB to MSB): x (8 bits), y (8 bits), rotation (8 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoseKey(u32);

impl From<Pose> for PoseKey {
    #[expect(clippy::cast_sign_loss)]
    fn from(pose: Pose) -> Self {
        let x = u32::from(pose.x as u8);
        let y = u32::from(pose.y as u8);
        let rotation = u32::from(pose.rotation.0);
        Self(x | (y << 8) | (rotation << 16))
    }
}

impl From<PoseKey> for Pose {
    #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn from(key: PoseKey) -> Self {
        let x = (key.0 & 0xff) as u8 as i8;
        let y = ((key.0 >> 8) & 0xff) as u8 as i8;
        let rotation = ((key.0 >> 16) & 0xff) as u8;
        Pose::new(x, y, PieceRotation(rotation))
    }
}

/// Index of a piece's shape variant.
///
/// Pieces have between one (O) and four (T, J, L) variants; rotating past the last
/// variant wraps back to the spawn orientation.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PieceRotation(u8);

impl PieceRotation {
    pub const SPAWN: Self = Self(0);

    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The next variant for the given kind, wrapping around.
    #[must_use]
    pub fn next(self, kind: PieceKind) -> Self {
        kind.normalize(Self(self.0 + 1))
    }
}

/// Enum representing the type of piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(u8)]
pub enum PieceKind {
    /// I-piece.
    I = 0,
    /// O-piece.
    O = 1,
    /// T-piece.
    T = 2,
    /// S-piece.
    S = 3,
    /// Z-piece.
    Z = 4,
    /// J-piece.
    J = 5,
    /// L-piece.
    L = 6,
}

impl Distribution<PieceKind> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceKind {
        PieceKind::ALL[rng.random_range(0..PieceKind::LEN)]
    }
}

impl PieceKind {
    /// Number of piece types (7).
    pub const LEN: usize = 7;

    pub const ALL: [Self; Self::LEN] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Number of distinct shape variants.
    #[must_use]
    pub const fn variant_count(self) -> usize {
        PIECE_SHAPES[self as usize].1
    }

    /// Shape matrix for the given rotation (taken modulo the variant count).
    #[must_use]
    pub fn shape(self, rotation: PieceRotation) -> Shape {
        let (shapes, count) = &PIECE_SHAPES[self as usize];
        shapes[rotation.index() % count]
    }

    fn normalize(self, rotation: PieceRotation) -> PieceRotation {
        #[expect(clippy::cast_possible_truncation)]
        let count = self.variant_count() as u8;
        PieceRotation(rotation.0 % count)
    }

    /// Returns the single character representation of this piece kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use escape_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::I.as_char(), 'I');
    /// assert_eq!(PieceKind::T.as_char(), 'T');
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::O => 'O',
            PieceKind::T => 'T',
            PieceKind::S => 'S',
            PieceKind::Z => 'Z',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
        }
    }

    /// Parses a piece kind from a single character.
    ///
    /// # Examples
    ///
    /// ```
    /// use escape_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_char('I'), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_char('X'), None);
    /// ```
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(PieceKind::I),
            'O' => Some(PieceKind::O),
            'T' => Some(PieceKind::T),
            'S' => Some(PieceKind::S),
            'Z' => Some(PieceKind::Z),
            'J' => Some(PieceKind::J),
            'L' => Some(PieceKind::L),
            _ => None,
        }
    }
}

/// Occupancy of a piece variant inside its tight bounding box.
///
/// Each row is a bitmask where bit `dx` marks an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    rows: [u8; 4],
    width: u8,
    height: u8,
}

impl Shape {
    const EMPTY: Self = Self {
        rows: [0; 4],
        width: 0,
        height: 0,
    };

    /// Builds a shape from rows of `#` (occupied) and `.` (empty) bytes.
    #[expect(clippy::cast_possible_truncation)]
    const fn parse(art: &[&[u8]]) -> Self {
        assert!(art.len() <= 4);
        let mut rows = [0; 4];
        let mut width = 0;
        let mut y = 0;
        while y < art.len() {
            let line = art[y];
            assert!(line.len() <= 4);
            if line.len() > width {
                width = line.len();
            }
            let mut x = 0;
            while x < line.len() {
                if line[x] == b'#' {
                    rows[y] |= 1 << x;
                }
                x += 1;
            }
            y += 1;
        }
        Self {
            rows,
            width: width as u8,
            height: art.len() as u8,
        }
    }

    #[must_use]
    pub fn width(self) -> usize {
        usize::from(self.width)
    }

    #[must_use]
    pub fn height(self) -> usize {
        usize::from(self.height)
    }

    /// Row bitmasks from top to bottom, one per bounding-box row.
    pub fn row_masks(self) -> impl Iterator<Item = u16> {
        self.rows.into_iter().take(self.height()).map(u16::from)
    }

    /// Relative `(dx, dy)` coordinates of the occupied cells.
    pub fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        (0..4u8).flat_map(move |dy| {
            let row = self.rows[usize::from(dy)];
            (0..4u8)
                .filter(move |dx| row & (1 << dx) != 0)
                .map(move |dx| (i32::from(dx), i32::from(dy)))
        })
    }
}

const PIECE_SHAPES: [([Shape; 4], usize); PieceKind::LEN] = {
    const E: Shape = Shape::EMPTY;
    const fn s(art: &[&[u8]]) -> Shape {
        Shape::parse(art)
    }
    [
        // I-piece
        ([s(&[b"####"]), s(&[b"#", b"#", b"#", b"#"]), E, E], 2),
        // O-piece
        ([s(&[b"##", b"##"]), E, E, E], 1),
        // T-piece
        (
            [
                s(&[b".#.", b"###"]),
                s(&[b"#.", b"##", b"#."]),
                s(&[b"###", b".#."]),
                s(&[b".#", b"##", b".#"]),
            ],
            4,
        ),
        // S-piece
        ([s(&[b".##", b"##."]), s(&[b"#.", b"##", b".#"]), E, E], 2),
        // Z-piece
        ([s(&[b"##.", b".##"]), s(&[b".#", b"##", b"#."]), E, E], 2),
        // J-piece
        (
            [
                s(&[b"#..", b"###"]),
                s(&[b"##", b"#.", b"#."]),
                s(&[b"###", b"..#"]),
                s(&[b".#", b".#", b"##"]),
            ],
            4,
        ),
        // L-piece
        (
            [
                s(&[b"..#", b"###"]),
                s(&[b"#.", b"#.", b"##"]),
                s(&[b"###", b"#.."]),
                s(&[b"##", b".#", b".#"]),
            ],
            4,
        ),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_has_four_cells_within_its_box() {
        for kind in PieceKind::ALL {
            for r in 0..kind.variant_count() {
                #[expect(clippy::cast_possible_truncation)]
                let shape = kind.shape(PieceRotation::new(r as u8));
                let cells: Vec<_> = shape.cells().collect();
                assert_eq!(cells.len(), 4, "{kind:?} rotation {r}");
                for (dx, dy) in cells {
                    assert!(usize::try_from(dx).unwrap() < shape.width());
                    assert!(usize::try_from(dy).unwrap() < shape.height());
                }
            }
        }
    }

    #[test]
    fn test_row_masks_follow_bounding_box() {
        let o = PieceKind::O.shape(PieceRotation::SPAWN);
        assert_eq!(o.row_masks().collect::<Vec<_>>(), vec![0b11, 0b11]);
        let i = PieceKind::I.shape(PieceRotation::SPAWN);
        assert_eq!(i.row_masks().collect::<Vec<_>>(), vec![0b1111]);
        let vertical = PieceKind::I.shape(PieceRotation::new(1));
        assert_eq!(vertical.row_masks().collect::<Vec<_>>(), vec![1; 4]);
    }

    #[test]
    fn test_variant_counts() {
        let counts: Vec<_> = PieceKind::ALL.iter().map(|k| k.variant_count()).collect();
        assert_eq!(counts, vec![2, 1, 4, 2, 2, 4, 4]);
    }

    #[test]
    fn test_rotation_wraps_per_kind() {
        let o = Piece::new(PieceKind::O);
        assert_eq!(o.rotated(), o);

        let i = Piece::new(PieceKind::I);
        assert_eq!(i.rotated().rotated().pose().rotation, PieceRotation::SPAWN);

        let t = Piece::new(PieceKind::T);
        let mut rotated = t;
        for _ in 0..4 {
            rotated = rotated.rotated();
        }
        assert_eq!(rotated, t);
    }

    #[test]
    fn test_spawn_is_centred() {
        assert_eq!(Piece::new(PieceKind::I).pose().x, 3);
        assert_eq!(Piece::new(PieceKind::O).pose().x, 4);
        assert_eq!(Piece::new(PieceKind::T).pose().x, 3);
        assert_eq!(Piece::new(PieceKind::T).pose().y, 0);
    }

    #[test]
    fn test_pose_key_round_trip_with_negative_coordinates() {
        for pose in [
            Pose::new(0, 0, PieceRotation::SPAWN),
            Pose::new(-3, -2, PieceRotation::new(3)),
            Pose::new(9, 19, PieceRotation::new(1)),
        ] {
            assert_eq!(Pose::from(pose.key()), pose);
        }
        assert_ne!(
            Pose::new(1, 2, PieceRotation::SPAWN).key(),
            Pose::new(2, 1, PieceRotation::SPAWN).key()
        );
    }

    #[test]
    fn test_piece_serialization() {
        let piece = Piece::with_pose(PieceKind::S, Pose::new(4, 18, PieceRotation::new(1)));

        let serialized = serde_json::to_string(&piece).unwrap();
        assert_eq!(serialized, "\"S#1@4,18\"");

        let deserialized: Piece = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, piece);

        let above_top: Piece = "I#1@0,-2".parse().unwrap();
        assert_eq!(above_top.pose().y, -2);
    }

    #[test]
    fn test_piece_parse_error_cases() {
        assert!("S1@4,18".parse::<Piece>().is_err());
        assert!("S#1#4,18".parse::<Piece>().is_err());
        assert!("S#1@4".parse::<Piece>().is_err());
        assert!("X#1@4,18".parse::<Piece>().is_err());
        // S has two variants
        assert!("S#2@4,18".parse::<Piece>().is_err());
        assert!("S#1@abc,18".parse::<Piece>().is_err());
    }

    #[test]
    fn test_piece_kind_char_conversion() {
        for kind in PieceKind::ALL {
            assert_eq!(PieceKind::from_char(kind.as_char()), Some(kind));
        }
        assert_eq!(PieceKind::from_char('x'), None);
    }
}
