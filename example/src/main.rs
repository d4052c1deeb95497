// example/src/main.rs

use brine_proto_wire::WireError;

// Bring the generated types into scope:
use example_app::generated::rich::{Color, Point, Top, TopPick};

fn main() -> Result<(), WireError> {
    // A message with a map, a oneof holding a message and a packed run
    let top = Top {
        id: 150,
        samples: vec![0.5, 2.0],
        colors: vec![Color::Red.into(), Color::Blue.into()],
        places: vec![("home".to_string(), Point { x: 3, y: -4, ..Default::default() })],
        pick: Some(TopPick::Point(Box::new(Point { x: 1, ..Default::default() }))),
        ..Default::default()
    };

    let bytes = top.encode();
    println!("encoded {} bytes: {:02X?}", bytes.len(), bytes);

    let decoded = Top::decode(&bytes)?;
    println!("id      = {}", decoded.id);
    println!("label   = {} (default)", decoded.label());
    println!("colors  = {:?}", decoded.colors.iter().map(|c| Color::from_i32(*c)).collect::<Vec<_>>());
    for (name, point) in &decoded.places {
        println!("  place {} = ({}, {})", name, point.x, point.y);
    }
    println!("pick    = {:?}", decoded.pick);

    Ok(())
}
