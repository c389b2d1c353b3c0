//! Synthetic colony workload used by `tickprof record`.
//!
//! The call structure is deterministic for a given tick number; only the
//! measured CPU time varies between runs.

use tickprof_trace::{Clock, Profiler};

/// Spin for roughly `iterations` units of work.
fn burn(iterations: u32) -> u64 {
    let mut acc = 0x9E37_79B9_7F4A_7C15u64;
    for i in 0..iterations {
        acc = acc.rotate_left(5) ^ u64::from(i);
        acc = acc.wrapping_mul(0x100_0000_01B3);
    }
    std::hint::black_box(acc)
}

#[derive(Debug, Clone)]
struct Room {
    name: String,
    creeps: u32,
}

#[derive(Debug, Clone)]
pub struct Colony {
    rooms: Vec<Room>,
    /// Base amount of work per creep action.
    work: u32,
}

impl Colony {
    pub fn new(rooms: usize, work: u32) -> Self {
        Colony {
            rooms: (0..rooms)
                .map(|i| Room {
                    name: format!("W{}N{}", i + 1, i * 3 + 7),
                    creeps: 2 + (i as u32 % 3),
                })
                .collect(),
            work,
        }
    }

    /// Run one tick's worth of instrumented work.
    pub fn run_tick<C: Clock>(&mut self, profiler: &Profiler<C>, tick: u64) {
        profiler.profile("Colony:run", || {
            for room in &mut self.rooms {
                profiler.profile("Room:run", || run_room(profiler, room, tick, self.work));
            }
        });

        if tick % 10 == 0 {
            profiler.add_mark(&format!("Memory cleanup at tick {tick}"), Some("gc"));
            profiler.profile("Memory:cleanup", || burn(self.work * 4));
        }

        profiler.profile("Memory:serialize", || burn(self.work * 2));
    }
}

fn run_room<C: Clock>(profiler: &Profiler<C>, room: &mut Room, tick: u64, work: u32) {
    profiler.profile("Room:planSpawns", || {
        burn(work);
        if tick % 7 == 0 && room.creeps < 8 {
            room.creeps += 1;
            profiler.add_intent();
            profiler.add_mark(&format!("Spawned creep in {}", room.name), Some("spawn"));
        }
    });

    for creep in 0..room.creeps {
        profiler.profile("Creep:run", || {
            profiler.profile("Creep:move", || {
                burn(work);
                profiler.add_intent();
            });
            if (u64::from(creep) + tick) % 2 == 0 {
                profiler.profile("Creep:harvest", || {
                    burn(work * 2);
                    profiler.add_intent();
                });
            } else {
                profiler.profile("Creep:upgrade", || {
                    burn(work * 3);
                    profiler.add_intent();
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickprof_trace::ManualClock;

    #[test]
    fn tick_structure_is_deterministic() {
        let profiler = Profiler::new(ManualClock::new());
        let mut colony = Colony::new(2, 10);

        profiler.start_tick(1);
        colony.run_tick(&profiler, 1);
        let root = profiler.end_tick().unwrap();

        let keys: Vec<&str> = root.children.iter().map(|c| c.key.as_ref()).collect();
        assert_eq!(keys, vec!["Colony:run", "Memory:serialize"]);

        let colony_node = &root.children[0];
        assert_eq!(colony_node.children.len(), 2);
        // Room 0 has 2 creeps: planSpawns + 2 x Creep:run
        assert_eq!(colony_node.children[0].children.len(), 3);
        // One move plus one harvest/upgrade intent per creep
        assert_eq!(colony_node.children[0].intents, 4);
    }

    #[test]
    fn cleanup_ticks_add_a_mark() {
        let profiler = Profiler::new(ManualClock::new());
        let mut colony = Colony::new(1, 1);

        profiler.start_tick(10);
        colony.run_tick(&profiler, 10);
        let root = profiler.end_tick().unwrap();
        let marks = root.marks.unwrap();
        assert!(marks.iter().any(|m| m.short_name == "gc"));
    }
}
