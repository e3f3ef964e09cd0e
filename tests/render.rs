use std::rc::Rc;

use swfsvg::tag::{
    DefineMorphShape, DefineShape, DefineSprite, FillStyle, Gradient, GradientRecord,
    GradientSpread, LineStyle, Movie, MorphFillStyle, PlaceObject, ShapeRecord, ShapeStyles,
    StyleChangeData, Tag,
};
use swfsvg::{
    Color, ColorTransform, Edge, Error, ErrorMask, Matrix, Options, Point, Rectangle,
    SwfExtractor,
};

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

fn rectangle_records(bounds: Rectangle, mut change: StyleChangeData) -> Vec<ShapeRecord> {
    change.move_to = Some(Point::new(bounds.x_min, bounds.y_min));
    vec![
        ShapeRecord::StyleChange(change),
        ShapeRecord::StraightEdge { delta_x: bounds.width(), delta_y: 0 },
        ShapeRecord::StraightEdge { delta_x: 0, delta_y: bounds.height() },
        ShapeRecord::StraightEdge { delta_x: -bounds.width(), delta_y: 0 },
    ]
}

fn filled_rectangle(id: u16, bounds: Rectangle, fill: FillStyle) -> Tag {
    Tag::DefineShape(Rc::new(DefineShape {
        version: 1,
        id,
        bounds,
        styles: ShapeStyles {
            fill_styles: vec![fill],
            line_styles: vec![],
        },
        records: rectangle_records(
            bounds,
            StyleChangeData {
                fill_style_1: Some(1),
                ..StyleChangeData::default()
            },
        ),
    }))
}

fn stroked_rectangle(id: u16, bounds: Rectangle, line: LineStyle) -> Tag {
    Tag::DefineShape(Rc::new(DefineShape {
        version: 1,
        id,
        bounds,
        styles: ShapeStyles {
            fill_styles: vec![],
            line_styles: vec![line],
        },
        records: rectangle_records(
            bounds,
            StyleChangeData {
                line_style: Some(1),
                ..StyleChangeData::default()
            },
        ),
    }))
}

fn place(depth: u16, id: u16) -> Tag {
    Tag::PlaceObject(Box::new(PlaceObject::place(depth, id)))
}

fn grayscale_gradient() -> FillStyle {
    FillStyle::LinearGradient(Gradient {
        matrix: Matrix::IDENTITY,
        spread: GradientSpread::Pad,
        records: vec![
            GradientRecord { ratio: 0, color: Color::rgba(0, 0, 0, 255) },
            GradientRecord { ratio: 255, color: Color::rgba(255, 255, 255, 255) },
        ],
    })
}

fn triangle_morph(id: u16) -> Tag {
    let records = vec![
        ShapeRecord::StyleChange(StyleChangeData {
            move_to: Some(Point::new(0, 0)),
            fill_style_1: Some(1),
            ..StyleChangeData::default()
        }),
        ShapeRecord::StraightEdge { delta_x: 200, delta_y: 0 },
        ShapeRecord::StraightEdge { delta_x: -100, delta_y: 150 },
        ShapeRecord::StraightEdge { delta_x: -100, delta_y: -150 },
    ];
    Tag::DefineMorphShape(Rc::new(DefineMorphShape {
        version: 1,
        id,
        start_bounds: Rectangle::new(0, 200, 0, 150),
        end_bounds: Rectangle::new(0, 200, 0, 150),
        fill_styles: vec![MorphFillStyle::Color {
            start: Color::rgba(0, 0, 0, 255),
            end: Color::rgba(255, 255, 255, 255),
        }],
        line_styles: vec![],
        start_records: records.clone(),
        end_records: records,
    }))
}

#[test]
fn a_red_rectangle_renders_to_a_single_path() {
    let mut ex = extractor(vec![
        filled_rectangle(
            1,
            Rectangle::new(0, 200, 0, 100),
            FillStyle::Color(Color::rgb(255, 0, 0)),
        ),
        Tag::End,
    ]);

    let svg = ex.render_character(1).unwrap();
    assert!(svg.contains("width=\"10px\""));
    assert!(svg.contains("height=\"5px\""));
    assert!(svg.contains("transform=\"matrix(1, 0, 0, 1, 0, 0)\""));
    assert!(svg.contains("fill=\"#ff0000\""));
    assert!(!svg.contains("fill-opacity"));
    assert_eq!(svg.matches("<path").count(), 1);
    assert!(svg.contains("d=\"M 0 0 L 10 0 L 10 5 L 0 5\""));
    assert!(svg.contains("fill-rule=\"evenodd\""));
}

#[test]
fn translucent_fills_carry_fill_opacity() {
    let mut ex = extractor(vec![
        filled_rectangle(
            1,
            Rectangle::new(0, 200, 0, 100),
            FillStyle::Color(Color::rgba(0, 128, 0, 51)),
        ),
        Tag::End,
    ]);

    let svg = ex.render_character(1).unwrap();
    assert!(svg.contains("fill=\"#008000\""));
    assert!(svg.contains("fill-opacity=\"0.2\""));
}

#[test]
fn identical_gradients_share_one_definition() {
    let mut ex = extractor(vec![
        filled_rectangle(1, Rectangle::new(0, 200, 0, 100), grayscale_gradient()),
        filled_rectangle(2, Rectangle::new(0, 400, 0, 200), grayscale_gradient()),
        place(1, 1),
        place(2, 2),
        Tag::ShowFrame,
        Tag::End,
    ]);

    let svg = ex.render_frame(0).unwrap();
    assert_eq!(svg.matches("<linearGradient").count(), 1);
    assert_eq!(svg.matches("url(#gradient-").count(), 2);
    assert_eq!(svg.matches("<path").count(), 2);
    assert!(svg.contains("gradientUnits=\"userSpaceOnUse\""));
    assert!(svg.contains("x1=\"-819.2\""));
    assert!(svg.contains("x2=\"819.2\""));
    assert!(svg.contains("offset=\"0\""));
    assert!(svg.contains("offset=\"1\""));
}

#[test]
fn thin_strokes_clamp_to_one_pixel() {
    let tags = vec![
        stroked_rectangle(
            1,
            Rectangle::new(0, 200, 0, 100),
            LineStyle {
                width: 10,
                color: Color::rgba(0, 0, 255, 255),
                fill: None,
            },
        ),
        Tag::End,
    ];

    let mut clamped = extractor(tags.clone());
    let svg = clamped.render_character(1).unwrap();
    assert!(svg.contains("stroke=\"#0000ff\""));
    assert!(svg.contains("stroke-width=\"1\""));
    assert!(svg.contains("vector-effect=\"non-scaling-stroke\""));
    assert!(svg.contains("stroke-linecap=\"round\""));
    assert!(svg.contains("stroke-linejoin=\"round\""));
    assert!(svg.contains("fill=\"none\""));

    let mut subpixel = SwfExtractor::new(
        movie(tags),
        Options {
            subpixel_stroke_width: true,
            ..Options::default()
        },
    );
    let svg = subpixel.render_character(1).unwrap();
    assert!(svg.contains("stroke-width=\"0.5\""));
    assert!(!svg.contains("vector-effect"));
}

#[test]
fn missing_bitmap_references_fall_back_to_the_empty_image() {
    let tags = vec![
        filled_rectangle(
            1,
            Rectangle::new(0, 200, 0, 100),
            FillStyle::Bitmap {
                id: 42,
                matrix: Matrix::IDENTITY,
                is_smoothed: true,
                is_repeating: false,
            },
        ),
        Tag::End,
    ];

    let mut strict = extractor(tags.clone());
    assert!(matches!(strict.shape(1), Err(Error::InvalidData(_))));

    let mask = ErrorMask::all().difference(ErrorMask::UNPROCESSABLE_DATA);
    let mut lenient = SwfExtractor::new(
        movie(tags),
        Options {
            error_mask: mask,
            ..Options::default()
        },
    );
    let svg = lenient.render_character(1).unwrap();
    assert!(svg.contains("url(#pattern-"));
    assert!(svg.contains("data:image/png;base64,"));
}

#[test]
fn morph_midpoint_blends_solid_fills() {
    let mut ex = extractor(vec![triangle_morph(1), Tag::End]);

    let svg = ex.render_morph_shape(1, 0.5).unwrap();
    assert!(svg.contains("fill=\"#808080\""));
    assert!(!svg.contains("fill-opacity"));
}

#[test]
fn morph_endpoints_match_static_processing() {
    let start_fill = Color::rgba(10, 20, 30, 255);
    let end_fill = Color::rgba(200, 210, 220, 255);
    let start_bounds = Rectangle::new(0, 200, 0, 150);
    let end_bounds = Rectangle::new(0, 400, 0, 300);

    let start_records = vec![
        ShapeRecord::StyleChange(StyleChangeData {
            move_to: Some(Point::new(0, 0)),
            fill_style_1: Some(1),
            ..StyleChangeData::default()
        }),
        ShapeRecord::StraightEdge { delta_x: 200, delta_y: 0 },
        ShapeRecord::StraightEdge { delta_x: -100, delta_y: 150 },
        ShapeRecord::StraightEdge { delta_x: -100, delta_y: -150 },
    ];
    let end_records = vec![
        ShapeRecord::StyleChange(StyleChangeData {
            move_to: Some(Point::new(0, 0)),
            ..StyleChangeData::default()
        }),
        ShapeRecord::StraightEdge { delta_x: 400, delta_y: 0 },
        ShapeRecord::StraightEdge { delta_x: -200, delta_y: 300 },
        ShapeRecord::StraightEdge { delta_x: -200, delta_y: -300 },
    ];

    let mut ex = extractor(vec![
        Tag::DefineMorphShape(Rc::new(DefineMorphShape {
            version: 1,
            id: 1,
            start_bounds,
            end_bounds,
            fill_styles: vec![MorphFillStyle::Color { start: start_fill, end: end_fill }],
            line_styles: vec![],
            start_records: start_records.clone(),
            end_records: end_records.clone(),
        })),
        Tag::DefineShape(Rc::new(DefineShape {
            version: 1,
            id: 2,
            bounds: start_bounds,
            styles: ShapeStyles {
                fill_styles: vec![FillStyle::Color(start_fill)],
                line_styles: vec![],
            },
            records: start_records,
        })),
        Tag::DefineShape(Rc::new(DefineShape {
            version: 1,
            id: 3,
            bounds: end_bounds,
            styles: ShapeStyles {
                fill_styles: vec![FillStyle::Color(end_fill)],
                line_styles: vec![],
            },
            // The end stream drops the style selection; add it back for
            // the static rendition.
            records: {
                let mut records = end_records;
                if let ShapeRecord::StyleChange(change) = &mut records[0] {
                    change.fill_style_1 = Some(1);
                }
                records
            },
        })),
        Tag::End,
    ]);

    assert_eq!(*ex.morph_shape(1, 0.0).unwrap(), *ex.shape(2).unwrap());
    assert_eq!(*ex.morph_shape(1, 1.0).unwrap(), *ex.shape(3).unwrap());
}

#[test]
fn straight_edges_promote_to_degenerate_quadratics() {
    let start_records = vec![
        ShapeRecord::StyleChange(StyleChangeData {
            move_to: Some(Point::new(0, 0)),
            fill_style_1: Some(1),
            ..StyleChangeData::default()
        }),
        ShapeRecord::StraightEdge { delta_x: 100, delta_y: 0 },
    ];
    let end_records = vec![
        ShapeRecord::StyleChange(StyleChangeData {
            move_to: Some(Point::new(0, 0)),
            ..StyleChangeData::default()
        }),
        ShapeRecord::CurvedEdge {
            control_delta_x: 50,
            control_delta_y: 50,
            anchor_delta_x: 50,
            anchor_delta_y: -50,
        },
    ];

    let mut ex = extractor(vec![
        Tag::DefineMorphShape(Rc::new(DefineMorphShape {
            version: 1,
            id: 1,
            start_bounds: Rectangle::new(0, 100, 0, 0),
            end_bounds: Rectangle::new(0, 100, 0, 50),
            fill_styles: vec![MorphFillStyle::Color {
                start: Color::rgba(0, 0, 0, 255),
                end: Color::rgba(0, 0, 0, 255),
            }],
            line_styles: vec![],
            start_records,
            end_records,
        })),
        Tag::End,
    ]);

    let shape = ex.morph_shape(1, 0.5).unwrap();
    assert_eq!(shape.paths.len(), 1);
    assert_eq!(
        shape.paths[0].edges[0],
        Edge::Curved {
            from: Point::new(0, 0),
            control: Point::new(50, 25),
            to: Point::new(100, 0),
        }
    );
}

#[test]
fn close_morph_ratios_coalesce_in_the_cache() {
    let mut ex = extractor(vec![triangle_morph(1), Tag::End]);

    let first = ex.morph_shape(1, 0.12341).unwrap();
    let second = ex.morph_shape(1, 0.12342).unwrap();
    assert!(Rc::ptr_eq(&first, &second));

    let other = ex.morph_shape(1, 0.125).unwrap();
    assert!(!Rc::ptr_eq(&first, &other));
}

#[test]
fn reused_sprite_frames_render_once_and_are_used_twice() {
    let mut ex = extractor(vec![
        filled_rectangle(
            1,
            Rectangle::new(0, 200, 0, 100),
            FillStyle::Color(Color::rgb(255, 0, 0)),
        ),
        Tag::DefineSprite(Rc::new(DefineSprite {
            id: 20,
            frame_count: 1,
            tags: Rc::new(vec![place(1, 1), Tag::ShowFrame, Tag::End]),
        })),
        place(1, 20),
        {
            let mut tag = PlaceObject::place(2, 20);
            tag.matrix = Some(Matrix::translation(4000, 0));
            Tag::PlaceObject(Box::new(tag))
        },
        Tag::ShowFrame,
        Tag::End,
    ]);

    let svg = ex.render_frame(0).unwrap();
    assert_eq!(svg.matches("<g id=\"object-").count(), 1);
    assert_eq!(svg.matches("<use").count(), 2);
    assert!(svg.contains("xlink:href=\"#object-0\""));
}

#[test]
fn color_transforms_apply_lazily_at_render_time() {
    let mut ex = extractor(vec![
        filled_rectangle(
            1,
            Rectangle::new(0, 200, 0, 100),
            FillStyle::Color(Color::rgb(255, 0, 0)),
        ),
        {
            let mut tag = PlaceObject::place(1, 1);
            tag.color_transform = Some(ColorTransform::multiply(0.5, 1.0, 1.0, 1.0));
            Tag::PlaceObject(Box::new(tag))
        },
        Tag::ShowFrame,
        Tag::End,
    ]);

    let svg = ex.render_frame(0).unwrap();
    assert!(svg.contains("fill=\"#800000\""));

    // The materialized shape itself stays untouched.
    assert!(ex.render_character(1).unwrap().contains("fill=\"#ff0000\""));
}

#[test]
fn documents_parse_and_ids_stay_unique() {
    let mut ex = extractor(vec![
        filled_rectangle(1, Rectangle::new(0, 200, 0, 100), grayscale_gradient()),
        filled_rectangle(2, Rectangle::new(0, 200, 0, 100), grayscale_gradient()),
        Tag::DefineSprite(Rc::new(DefineSprite {
            id: 20,
            frame_count: 1,
            tags: Rc::new(vec![place(1, 1), place(2, 2), Tag::ShowFrame, Tag::End]),
        })),
        place(1, 20),
        place(2, 20),
        place(3, 1),
        Tag::ShowFrame,
        Tag::End,
    ]);

    let svg = ex.render_frame(0).unwrap();
    let document = roxmltree::Document::parse(&svg).unwrap();

    let mut ids: Vec<&str> = document
        .descendants()
        .filter_map(|node| node.attribute("id"))
        .collect();
    assert!(!ids.is_empty());
    ids.sort_unstable();
    let before = ids.len();
    ids.dedup();
    assert_eq!(ids.len(), before, "duplicate ids in: {}", svg);
}
