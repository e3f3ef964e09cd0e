use std::rc::Rc;

use swfsvg::tag::{
    DefineShape, DefineSprite, FillStyle, Movie, PlaceObject, ShapeRecord, ShapeStyles,
    StyleChangeData, Tag,
};
use swfsvg::{Color, Error, ErrorMask, Matrix, Options, Point, Rectangle, SwfExtractor};

fn movie(tags: Vec<Tag>) -> Movie {
    Movie {
        bounds: Rectangle::new(0, 11000, 0, 8000),
        frame_rate: 24.0,
        frame_count: 1,
        tags: Rc::new(tags),
    }
}

fn extractor(tags: Vec<Tag>) -> SwfExtractor {
    SwfExtractor::new(movie(tags), Options::default())
}

fn extractor_masked(tags: Vec<Tag>, mask: ErrorMask) -> SwfExtractor {
    SwfExtractor::new(
        movie(tags),
        Options {
            error_mask: mask,
            ..Options::default()
        },
    )
}

fn rectangle_shape(id: u16, bounds: Rectangle) -> Tag {
    Tag::DefineShape(Rc::new(DefineShape {
        version: 1,
        id,
        bounds,
        styles: ShapeStyles {
            fill_styles: vec![FillStyle::Color(Color::rgb(255, 0, 0))],
            line_styles: vec![],
        },
        records: vec![
            ShapeRecord::StyleChange(StyleChangeData {
                move_to: Some(Point::new(bounds.x_min, bounds.y_min)),
                fill_style_1: Some(1),
                ..StyleChangeData::default()
            }),
            ShapeRecord::StraightEdge { delta_x: bounds.width(), delta_y: 0 },
            ShapeRecord::StraightEdge { delta_x: 0, delta_y: bounds.height() },
            ShapeRecord::StraightEdge { delta_x: -bounds.width(), delta_y: 0 },
            ShapeRecord::StraightEdge { delta_x: 0, delta_y: -bounds.height() },
        ],
    }))
}

fn sprite(id: u16, tags: Vec<Tag>) -> Tag {
    let frame_count = tags.iter().filter(|t| matches!(t, Tag::ShowFrame)).count() as u16;
    Tag::DefineSprite(Rc::new(DefineSprite {
        id,
        frame_count,
        tags: Rc::new(tags),
    }))
}

fn place(depth: u16, id: u16) -> Tag {
    Tag::PlaceObject(Box::new(PlaceObject::place(depth, id)))
}

fn place_at(depth: u16, id: u16, matrix: Matrix) -> Tag {
    let mut tag = PlaceObject::place(depth, id);
    tag.matrix = Some(matrix);
    Tag::PlaceObject(Box::new(tag))
}

fn move_to(depth: u16, matrix: Matrix) -> Tag {
    let mut tag = PlaceObject::modify(depth);
    tag.matrix = Some(matrix);
    Tag::PlaceObject(Box::new(tag))
}

#[test]
fn empty_file_without_frames_is_an_empty_timeline_when_masked() {
    let mask = ErrorMask::all().difference(ErrorMask::UNPROCESSABLE_DATA);
    let mut ex = extractor_masked(vec![Tag::End], mask);

    let timeline = ex.timeline(false).unwrap();
    assert_eq!(timeline.bounds, Rectangle::default());
    assert_eq!(timeline.frames_count(), 1);
    assert!(timeline.frames[0].objects.is_empty());
}

#[test]
fn empty_file_without_frames_raises_when_enabled() {
    let mut ex = extractor(vec![Tag::End]);
    assert!(matches!(ex.timeline(false), Err(Error::InvalidData(_))));
}

#[test]
fn frames_match_show_frame_records() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        place(1, 7),
        Tag::ShowFrame,
        Tag::ShowFrame,
        Tag::ShowFrame,
        Tag::End,
    ]);

    let timeline = ex.timeline(false).unwrap();
    assert_eq!(timeline.frames_count(), 3);
    for frame in &timeline.frames {
        assert_eq!(frame.bounds, timeline.bounds);
        assert_eq!(frame.objects.len(), 1);
    }
}

#[test]
fn moving_an_object_shifts_its_matrix_but_not_the_shared_bounds() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        place(1, 7),
        Tag::ShowFrame,
        move_to(1, Matrix::translation(2000, 0)),
        Tag::ShowFrame,
        Tag::End,
    ]);

    let timeline = ex.timeline(false).unwrap();
    assert_eq!(timeline.frames_count(), 2);

    let first = timeline.frames[0].object_at_depth(1).unwrap();
    let second = timeline.frames[1].object_at_depth(1).unwrap();
    assert_eq!(first.matrix.translate_x - second.matrix.translate_x, -2000);
    assert_eq!(first.bounds, Rectangle::new(0, 200, 0, 100));
    assert_eq!(second.bounds, Rectangle::new(2000, 2200, 0, 100));
    // The union rewrite leaves every frame with identical bounds.
    assert_eq!(timeline.frames[0].bounds, timeline.frames[1].bounds);
    assert_eq!(timeline.bounds, Rectangle::new(0, 2200, 0, 100));
}

#[test]
fn file_bounds_replace_every_frame_bounds() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        place(1, 7),
        Tag::ShowFrame,
        Tag::End,
    ]);

    let timeline = ex.timeline(true).unwrap();
    assert_eq!(timeline.bounds, Rectangle::new(0, 11000, 0, 8000));
    assert!(timeline.frames.iter().all(|f| f.bounds == timeline.bounds));
}

#[test]
fn removed_objects_leave_the_next_frame() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        place(1, 7),
        Tag::ShowFrame,
        Tag::RemoveObject { depth: 1, character_id: None },
        Tag::ShowFrame,
        Tag::End,
    ]);

    let timeline = ex.timeline(false).unwrap();
    assert_eq!(timeline.frames[0].objects.len(), 1);
    assert!(timeline.frames[1].objects.is_empty());
}

#[test]
fn objects_are_ordered_by_depth() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        place(9, 7),
        place(2, 7),
        place(5, 7),
        Tag::ShowFrame,
        Tag::End,
    ]);

    let timeline = ex.timeline(false).unwrap();
    let depths: Vec<u16> = timeline.frames[0].objects.iter().map(|o| o.depth).collect();
    assert_eq!(depths, vec![2, 5, 9]);
}

#[test]
fn labels_and_actions_attach_to_their_frame() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        Tag::FrameLabel("intro".into()),
        Tag::DoAction(vec![0x81, 0x00]),
        place(1, 7),
        Tag::ShowFrame,
        Tag::ShowFrame,
        Tag::End,
    ]);

    let timeline = ex.timeline(false).unwrap();
    assert_eq!(timeline.frames[0].label.as_deref(), Some("intro"));
    assert_eq!(timeline.frames[0].actions.len(), 1);
    assert_eq!(timeline.frames[1].label, None);
    assert!(timeline.frames[1].actions.is_empty());

    let (index, _) = timeline.frame_by_label("intro").unwrap();
    assert_eq!(index, 0);
}

#[test]
fn oversized_objects_stay_out_of_the_union() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        rectangle_shape(8, Rectangle::new(0, 200_000, 0, 100)),
        place(1, 7),
        place(2, 8),
        Tag::ShowFrame,
        Tag::End,
    ]);

    let timeline = ex.timeline(false).unwrap();
    assert_eq!(timeline.bounds, Rectangle::new(0, 200, 0, 100));
    // The object itself is still part of the frame.
    assert_eq!(timeline.frames[0].objects.len(), 2);
}

#[test]
fn every_kept_object_fits_in_the_union() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        place_at(1, 7, Matrix::translation(400, 0)),
        place(2, 7),
        Tag::ShowFrame,
        Tag::End,
    ]);

    let timeline = ex.timeline(false).unwrap();
    for object in &timeline.frames[0].objects {
        assert_eq!(timeline.bounds.union(&object.bounds), timeline.bounds);
    }
}

#[test]
fn placing_nothing_raises_or_skips() {
    let bad_place = {
        let mut tag = PlaceObject::place(1, 0);
        tag.character_id = None;
        Tag::PlaceObject(Box::new(tag))
    };

    let mut strict = extractor(vec![bad_place.clone(), Tag::ShowFrame, Tag::End]);
    assert!(matches!(strict.timeline(false), Err(Error::InvalidData(_))));

    let mask = ErrorMask::all().difference(ErrorMask::UNPROCESSABLE_DATA);
    let mut lenient = extractor_masked(vec![bad_place, Tag::ShowFrame, Tag::End], mask);
    let timeline = lenient.timeline(false).unwrap();
    assert!(timeline.frames[0].objects.is_empty());
}

#[test]
fn modifying_an_empty_depth_raises_or_skips() {
    let tags = vec![
        move_to(4, Matrix::translation(100, 100)),
        Tag::ShowFrame,
        Tag::End,
    ];

    let mut strict = extractor(tags.clone());
    assert!(matches!(strict.timeline(false), Err(Error::InvalidData(_))));

    let mask = ErrorMask::all().difference(ErrorMask::UNPROCESSABLE_DATA);
    let mut lenient = extractor_masked(tags, mask);
    assert!(lenient.timeline(false).unwrap().frames[0].objects.is_empty());
}

#[test]
fn swapping_the_character_redoes_the_translation_dance() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        rectangle_shape(8, Rectangle::new(1000, 1400, 1000, 1200)),
        place_at(1, 7, Matrix::translation(2000, 0)),
        Tag::ShowFrame,
        {
            let mut tag = PlaceObject::modify(1);
            tag.character_id = Some(8);
            Tag::PlaceObject(Box::new(tag))
        },
        Tag::ShowFrame,
        Tag::End,
    ]);

    let timeline = ex.timeline(false).unwrap();
    let swapped = timeline.frames[1].object_at_depth(1).unwrap();
    assert_eq!(swapped.character_id, 8);
    // The kept place matrix projects the new character's bounds.
    assert_eq!(swapped.bounds, Rectangle::new(3000, 3400, 1000, 1200));
    // The drawing matrix folds the new top-left corner in.
    assert_eq!(swapped.matrix.translate_x, 3000);
    assert_eq!(swapped.matrix.translate_y, 1000);
}

#[test]
fn nested_sprite_bounds_feed_the_parent_timeline() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        sprite(20, vec![place(1, 7), Tag::ShowFrame, Tag::End]),
        place_at(1, 20, Matrix::translation(400, 400)),
        Tag::ShowFrame,
        Tag::End,
    ]);

    let nested = ex.sprite_timeline(20).unwrap();
    assert_eq!(nested.bounds, Rectangle::new(0, 200, 0, 100));

    let timeline = ex.timeline(false).unwrap();
    assert_eq!(timeline.bounds, Rectangle::new(400, 600, 400, 500));
}

#[test]
fn self_referential_sprite_raises_when_enabled() {
    let mut ex = extractor(vec![
        sprite(10, vec![place(1, 10), Tag::ShowFrame, Tag::End]),
        Tag::End,
    ]);

    assert!(matches!(
        ex.sprite_timeline(10),
        Err(Error::CircularReference(10))
    ));
}

#[test]
fn self_referential_sprite_collapses_to_an_empty_timeline_when_masked() {
    let mask = ErrorMask::all().difference(ErrorMask::CIRCULAR_REFERENCE);
    let mut ex = extractor_masked(
        vec![
            sprite(10, vec![place(1, 10), Tag::ShowFrame, Tag::End]),
            place(1, 10),
            Tag::ShowFrame,
            Tag::End,
        ],
        mask,
    );

    let nested = ex.sprite_timeline(10).unwrap();
    assert_eq!(nested.bounds, Rectangle::default());
    assert_eq!(nested.frames_count(), 1);
    assert!(nested.frames[0].objects.is_empty());

    // The root timeline still renders, without the self-reference.
    let svg = ex.render_frame(0).unwrap();
    assert!(svg.starts_with("<svg"));
}

#[test]
fn morph_ratio_travels_with_the_object() {
    let mut ex = extractor(vec![
        rectangle_shape(7, Rectangle::new(0, 200, 0, 100)),
        {
            let mut tag = PlaceObject::place(1, 7);
            tag.ratio = Some(32768);
            Tag::PlaceObject(Box::new(tag))
        },
        Tag::ShowFrame,
        Tag::End,
    ]);

    let timeline = ex.timeline(false).unwrap();
    let object = timeline.frames[0].object_at_depth(1).unwrap();
    assert_eq!(object.ratio, Some(32768));
    assert!((object.morph_ratio() - 0.5).abs() < 1e-4);
}
