//! S5 — Replay determinism: a recorded run and a re-simulated run of the
//! same frames agree on frame number, rng seed and total time exactly, and
//! on component state within the recorder's float tolerance.

use replisim_core::replay::{ComponentRecord, EntityRecord, FrameSnapshot, NoFloatFields, ReplayRecorder};

fn recorded_run(frame_count: u64) -> Vec<FrameSnapshot> {
    (1..=frame_count)
        .map(|n| {
            let mut snapshot = FrameSnapshot::empty(n, n as f64 / 60.0, 1234);
            snapshot.entities.push(EntityRecord {
                id: 1,
                components: vec![ComponentRecord {
                    type_tag: 9,
                    bytes: (n as f32 * 0.5).to_le_bytes().to_vec(),
                }],
            });
            snapshot
        })
        .collect()
}

#[test]
fn recorded_frames_round_trip_through_the_container_bit_for_bit() {
    let frames = recorded_run(30);
    let mut recorder = ReplayRecorder::new_recording();
    for frame in &frames {
        recorder.record_frame(frame.clone());
    }

    let mut buf = Vec::new();
    recorder.write_to(&mut buf).unwrap();
    let playback = ReplayRecorder::read_from(&mut &buf[..]).unwrap();

    assert_eq!(playback.current_frame().unwrap(), &frames[0]);
}

#[test]
fn resimulation_matching_within_tolerance_reports_no_divergence() {
    let recorded = recorded_run(5);

    // a re-simulated run that reproduces the same trajectory up to a tiny
    // floating point wobble introduced by a different evaluation order.
    let resimulated: Vec<FrameSnapshot> = recorded
        .iter()
        .map(|frame| {
            let mut resim = frame.clone();
            for entity in &mut resim.entities {
                for component in &mut entity.components {
                    let value = f32::from_le_bytes(component.bytes.clone().try_into().unwrap());
                    component.bytes = (value + 1e-5).to_le_bytes().to_vec();
                }
            }
            resim
        })
        .collect();

    struct Vec3Float;
    impl replisim_core::replay::FloatFieldRegistry for Vec3Float {
        fn float_ranges(&self, _type_tag: u32) -> &[(usize, usize)] {
            &[(0, 4)]
        }
    }

    for (recorded_frame, resim_frame) in recorded.iter().zip(resimulated.iter()) {
        assert_eq!(recorded_frame.frame_number, resim_frame.frame_number);
        assert_eq!(recorded_frame.rng_seed, resim_frame.rng_seed);
        assert!((recorded_frame.total_time_s - resim_frame.total_time_s).abs() < f64::EPSILON);

        let reports = ReplayRecorder::compare_frame(&Vec3Float, recorded_frame, resim_frame);
        assert!(reports.is_empty(), "expected no divergence within tolerance, got {:?}", reports);
    }
}

#[test]
fn resimulation_with_a_real_divergence_is_detected() {
    let recorded = recorded_run(1);
    let mut resimulated = recorded.clone();
    resimulated[0].entities[0].components[0].bytes = 999.0f32.to_le_bytes().to_vec();

    let reports = ReplayRecorder::compare_frame(&NoFloatFields, &recorded[0], &resimulated[0]);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, 1);
    assert_eq!(reports[0].type_tag, 9);
}
