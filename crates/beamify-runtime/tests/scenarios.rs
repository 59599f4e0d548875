use beamify_field::{Axis, Coord, VoxelField};
use beamify_runtime::{BeamifyConfig, Beamifier};

fn field_of(dims: (usize, usize, usize), cells: &[Coord], material: u32) -> VoxelField {
    let mut f = VoxelField::new(dims.0, dims.1, dims.2);
    for c in cells {
        f.set(*c, material);
    }
    f
}

fn beamifier(config: BeamifyConfig) -> Beamifier {
    Beamifier::new(BeamifyConfig {
        time_budget_ms: 20_000,
        ..config
    })
    .unwrap()
}

#[test]
fn eight_in_a_row_becomes_two_four_beams() {
    let cells: Vec<Coord> = (0..8).map(|x| Coord::new(x, 0, 0)).collect();
    let field = field_of((8, 1, 1), &cells, 33);
    let report = beamifier(BeamifyConfig::default()).run(&field).unwrap();

    assert_eq!(report.passes.len(), 2);
    assert_eq!(report.passes[0].four_beams, 2);
    assert!(report.passes[1].terminal);

    let beams = report.labeled.beams();
    let spans: Vec<(Coord, Option<Axis>, usize, u32)> = beams
        .iter()
        .map(|b| (b.origin, b.axis, b.length, b.material))
        .collect();
    assert_eq!(
        spans,
        vec![
            (Coord::new(0, 0, 0), Some(Axis::X), 4, 33),
            (Coord::new(4, 0, 0), Some(Axis::X), 4, 33),
        ]
    );
}

#[test]
fn isolated_cell_stays_a_unit_block() {
    let field = field_of((3, 3, 3), &[Coord::new(1, 1, 1)], 1);
    let report = beamifier(BeamifyConfig::default()).run(&field).unwrap();
    assert_eq!(report.passes.len(), 1);
    let beams = report.labeled.beams();
    assert_eq!(beams.len(), 1);
    assert_eq!((beams[0].origin, beams[0].length, beams[0].axis), (Coord::new(1, 1, 1), 1, None));
}

#[test]
fn l_shape_splits_into_short_beams() {
    let cells = [
        Coord::new(0, 0, 0),
        Coord::new(1, 0, 0),
        Coord::new(2, 0, 0),
        Coord::new(0, 1, 0),
        Coord::new(0, 2, 0),
    ];
    let field = field_of((3, 3, 1), &cells, 1);
    let report = beamifier(BeamifyConfig::default()).run(&field).unwrap();
    assert!(report.labeled.covers_materials());
    let beams = report.labeled.beams();
    assert_eq!(beams.iter().map(|b| b.length).sum::<usize>(), 5);
    assert!(beams.iter().all(|b| b.length < 4));
    assert_eq!(beams.len(), report.labeled.group_count());
}

fn solid(dims: (usize, usize, usize)) -> Vec<Coord> {
    let mut cells = Vec::new();
    for x in 0..dims.0 {
        for y in 0..dims.1 {
            for z in 0..dims.2 {
                cells.push(Coord::new(x, y, z));
            }
        }
    }
    cells
}

#[test]
fn alternate_bias_keeps_symmetric_slabs_symmetric() {
    for n in [5, 6, 7, 8, 9] {
        let cells = solid((2, 2, n));
        let field = field_of((2, 2, n), &cells, 1);
        let config = BeamifyConfig {
            bias: "alternate".parse().unwrap(),
            ..Default::default()
        };
        let report = beamifier(config).run(&field).unwrap();
        assert!(report.labeled.covers_materials());
        let labels = &report.labeled.labels;
        let rot = |c: &Coord| Coord::new(1 - c.x, 1 - c.y, c.z);
        // two cells share a group iff their 180 degree rotations about the z axis do
        for a in &cells {
            for b in &cells {
                let same = labels.get(*a) == labels.get(*b);
                let same_rot = labels.get(rot(a)) == labels.get(rot(b));
                assert_eq!(same, same_rot, "2x2x{n}: {a} / {b}");
            }
        }
        let beams = report.labeled.beams();
        assert!(beams.iter().all(|b| b.length > 1), "2x2x{n} left a unit block");
        for b in &beams {
            let turned = beams.iter().find(|o| o.cells().any(|c| c == rot(&b.origin)));
            assert_eq!(
                turned.map(|o| (o.length, o.axis)),
                Some((b.length, b.axis)),
                "2x2x{n}: beam at {} has no rotated twin",
                b.origin
            );
        }
        if n == 8 {
            assert!(beams.iter().all(|b| b.length == 4));
        }
    }
}

#[test]
fn solid_six_cube_is_no_worse_than_z_columns() {
    let cells = solid((6, 6, 6));
    let field = field_of((6, 6, 6), &cells, 5);
    let report = Beamifier::new(BeamifyConfig::default()).unwrap().run(&field).unwrap();
    assert!(report.labeled.covers_materials());
    assert!(report.passes.iter().all(|p| !p.any_failed()), "{:?}", report.passes);

    let beams = report.labeled.beams();
    assert_eq!(beams.iter().map(|b| b.length).sum::<usize>(), 216);
    assert!(beams.iter().all(|b| b.length > 1));
    // a 4 and a 2 up each of the 36 z columns
    assert!(beams.len() <= 72, "{} parts", beams.len());
}

#[test]
fn debeamify_yields_unit_blocks_in_one_pass() {
    let cells: Vec<Coord> = (0..6).map(|z| Coord::new(0, 0, z)).collect();
    let field = field_of((1, 1, 6), &cells, 2);
    let config = BeamifyConfig {
        debeamify: true,
        ..Default::default()
    };
    let report = beamifier(config).run(&field).unwrap();
    assert_eq!(report.passes.len(), 1);
    assert_eq!(report.passes[0].blobs, 1);
    assert!(report.labeled.beams().iter().all(|b| b.length == 1));
    assert_eq!(report.labeled.group_count(), 6);
}

#[test]
fn materials_never_share_a_beam() {
    let mut field = VoxelField::new(8, 1, 1);
    for x in 0..8 {
        field.set(Coord::new(x, 0, 0), if x < 4 { 1 } else { 2 });
    }
    let report = beamifier(BeamifyConfig::default()).run(&field).unwrap();
    let beams = report.labeled.beams();
    assert_eq!(beams.len(), 2);
    assert_eq!(beams[0].material, 1);
    assert_eq!(beams[1].material, 2);
}

#[test]
fn empty_field_finishes_immediately() {
    let field = VoxelField::new(2, 2, 2);
    let report = beamifier(BeamifyConfig::default()).run(&field).unwrap();
    assert_eq!(report.passes.len(), 1);
    assert_eq!(report.passes[0].blobs, 0);
    assert!(report.labeled.beams().is_empty());
}
