use super::*;

fn templates() -> Vec<Template> {
    vec![
        Template {
            id: "drake".into(),
            name: "Drake".into(),
            image_url: "templates/drake.png".into(),
        },
        Template {
            id: "buttons".into(),
            name: "Two Buttons".into(),
            image_url: "templates/buttons.png".into(),
        },
    ]
}

fn ideas(best: usize) -> IdeaSet {
    IdeaSet::new(["one".into(), "two".into(), "three".into()], best).unwrap()
}

#[test]
fn begin_validates_identity() {
    assert!(StudySession::begin("", "s", "t", templates()).is_err());
    assert!(StudySession::begin("p", "s", "  ", templates()).is_err());
    let mut dup = templates();
    dup.push(dup[0].clone());
    assert!(StudySession::begin("p", "s", "t", dup).is_err());
}

#[test]
fn ideas_mirror_into_locked_layer() {
    let mut s = StudySession::begin("p", "s", "exams", templates()).unwrap();
    s.set_ideas("drake", ideas(1)).unwrap();
    assert_eq!(s.work("drake").unwrap().layers.locked().unwrap().text, "two");

    s.select_best("drake", 2).unwrap();
    assert_eq!(s.work("drake").unwrap().layers.locked().unwrap().text, "three");

    assert!(s.select_best("drake", 3).is_err());
    assert!(s.set_ideas("missing", ideas(0)).is_err());
}

#[test]
fn layer_edits_stay_with_their_template() {
    let mut s = StudySession::begin("p", "s", "exams", templates()).unwrap();
    let id = s.layers_mut("buttons").unwrap().add_layer();
    assert!(s.work("buttons").unwrap().layers.get(&id).is_some());
    assert!(s.work("drake").unwrap().layers.get(&id).is_none());
}

#[test]
fn finish_reports_completed_templates() {
    let mut s = StudySession::begin("p", "s", "exams", templates()).unwrap();
    s.set_ideas("buttons", ideas(0)).unwrap();
    let summary = s.finish();
    assert_eq!(summary.participant_id, "p");
    assert_eq!(summary.completed_templates, vec!["buttons".to_string()]);
    assert!(summary.finished_at >= summary.started_at);
}
