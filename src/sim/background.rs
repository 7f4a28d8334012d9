//! Scrolling backdrop tiles
//!
//! Tiles move as a group: the pool keeps them stacked edge to edge, scrolls the
//! frontmost one and re-chains the rest above it every tick, so the visible
//! arena is always covered.

use glam::Vec2;

use super::collision::Rect;
use super::pool::{EntityPool, Life, Pooled, Updatable};
use super::tick::TickCtx;
use crate::error::SimResult;

#[derive(Debug, Clone, Default)]
pub struct Background {
    /// Center position
    pub position: Vec2,
    pub size: Vec2,
}

/// Spawn arguments: a tile whose bottom edge sits at `bottom`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSpawn {
    pub center_x: f32,
    pub bottom: f32,
    pub size: Vec2,
}

impl Pooled for Background {
    const KIND: &'static str = "background";
    type Args = TileSpawn;

    fn reset(&mut self, args: TileSpawn) {
        *self = Self {
            position: Vec2::new(args.center_x, args.bottom - args.size.y * 0.5),
            size: args.size,
        };
    }
}

impl Background {
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.position, self.size)
    }

    fn set_bottom(&mut self, bottom: f32) {
        self.position.y = bottom - self.size.y * 0.5;
    }
}

impl<'w> Updatable<TickCtx<'w>> for Background {
    fn update(&mut self, _life: &mut Life, _delta: f32, _ctx: &mut TickCtx<'w>) -> SimResult<()> {
        // Tiles are moved by update_class
        Ok(())
    }

    fn update_class(pool: &mut EntityPool<Self>, delta: f32, ctx: &mut TickCtx<'w>) -> SimResult<()> {
        let arena = ctx.bounds;
        let tile = TileSpawn {
            center_x: arena.center().x,
            bottom: arena.bottom(),
            size: arena.size(),
        };

        // Frontmost (largest top edge) first
        pool.sort_active_by(|a, b| b.rect().top().total_cmp(&a.rect().top()));
        let handles = pool.active_handles();

        // Scroll the frontrunner; a tile that left the screen hands the lead
        // to the next one, which scrolls in the same tick
        let mut front = None;
        for (i, &handle) in handles.iter().enumerate() {
            let Some(background) = pool.get_mut(handle) else {
                continue;
            };
            background.position.y += ctx.config.background_speed * delta;
            if background.rect().top() >= arena.bottom() {
                pool.kill_instance_safe(handle);
            } else {
                front = Some(i);
                break;
            }
        }

        // Stack the rest edge to edge above the frontrunner
        if let Some(front) = front {
            let mut top = pool
                .get(handles[front])
                .map_or(arena.bottom(), |b| b.rect().top());
            for &handle in &handles[front + 1..] {
                if let Some(background) = pool.get_mut(handle) {
                    background.set_bottom(top);
                    top = background.rect().top();
                }
            }
        }
        pool.flush_zombies();

        if !ctx.config.spawn_background {
            return Ok(());
        }
        let highest = pool
            .iter_live()
            .map(|(_, b)| b.rect().top())
            .min_by(f32::total_cmp);
        match highest {
            Some(top) if top > arena.top() => {
                pool.spawn(TileSpawn { bottom: top, ..tile })?;
            }
            Some(_) => {}
            None => {
                log::warn!("backdrop ran out of tiles, restarting at the bottom edge");
                pool.spawn(tile)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tick::fixture::TickFixture;

    fn tile(arena: Rect) -> TileSpawn {
        TileSpawn {
            center_x: arena.center().x,
            bottom: arena.bottom(),
            size: arena.size(),
        }
    }

    fn assert_covered(pool: &EntityPool<Background>, arena: Rect) {
        let mut rects: Vec<Rect> = pool.iter_live().map(|(_, b)| b.rect()).collect();
        rects.sort_by(|a, b| b.top().total_cmp(&a.top()));
        assert!(rects[0].bottom() >= arena.bottom() - 1e-3);
        assert!(rects.last().map(|r| r.top()).unwrap() <= arena.top() + 1e-3);
        for pair in rects.windows(2) {
            assert!((pair[0].top() - pair[1].bottom()).abs() < 1e-2);
        }
    }

    #[test]
    fn test_gap_at_top_spawns_a_tile() {
        let mut fx = TickFixture::new();
        let arena = fx.config.arena();
        let mut pool = EntityPool::<Background>::new(5);
        pool.spawn(tile(arena)).unwrap();

        fx.step(&mut pool, 0.5).unwrap();
        assert_eq!(pool.live_len(), 2);
        assert_covered(&pool, arena);
    }

    #[test]
    fn test_long_scroll_stays_contiguous_within_capacity() {
        let mut fx = TickFixture::new();
        let arena = fx.config.arena();
        let mut pool = EntityPool::<Background>::new(5);
        pool.spawn(tile(arena)).unwrap();

        // 30 seconds of scrolling retires several tiles
        for _ in 0..300 {
            fx.step(&mut pool, 0.1).unwrap();
            assert!(pool.live_len() <= 3);
            assert_covered(&pool, arena);
        }
    }

    #[test]
    fn test_tiling_can_be_disabled() {
        let mut fx = TickFixture::new();
        fx.config.spawn_background = false;
        let arena = fx.config.arena();
        let mut pool = EntityPool::<Background>::new(5);
        pool.spawn(tile(arena)).unwrap();

        fx.step(&mut pool, 1.0).unwrap();
        assert_eq!(pool.live_len(), 1);
        // 120 px/s: the tile leaves after 4.5 s
        for _ in 0..5 {
            fx.step(&mut pool, 1.0).unwrap();
        }
        assert!(pool.is_empty());
    }
}
