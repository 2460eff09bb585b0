//! Integer sine and cosine at scale 1024.

/// `round(1024 * sin(d))` for whole degrees `d` in `0..=90`.
const SINUS: [i32; 91] = [
    0, 18, 36, 54, 71, 89, 107, 125, 143, 160, 178, 195, 213, 230, 248, 265, 282, 299, 316, 333,
    350, 367, 384, 400, 416, 433, 449, 465, 481, 496, 512, 527, 543, 558, 573, 587, 602, 616, 630,
    644, 658, 672, 685, 698, 711, 724, 737, 749, 761, 773, 784, 796, 807, 818, 828, 839, 849, 859,
    868, 878, 887, 896, 904, 912, 920, 928, 935, 943, 949, 956, 962, 968, 974, 979, 984, 989, 994,
    998, 1002, 1005, 1008, 1011, 1014, 1016, 1018, 1020, 1022, 1023, 1023, 1024, 1024,
];

/// Cosine and sine of `deg` degrees, scaled by 1024.
pub fn icossin(deg: i32) -> (i32, i32) {
    let mut deg = deg.rem_euclid(360);
    let mut sinsign = 1;
    let mut cossign = 1;
    if deg > 180 {
        deg = 360 - deg;
        sinsign = -1;
    }
    if deg > 90 {
        deg = 180 - deg;
        cossign = -1;
    }
    let d = deg as usize;
    (cossign * SINUS[90 - d], sinsign * SINUS[d])
}

/// Cosine and sine of the angle of the vector `(x, y)`, scaled by 1024.
///
/// The zero vector is treated as angle 0.
pub fn icossin2(x: i32, y: i32) -> (i32, i32) {
    if x == 0 && y == 0 {
        return (1024, 0);
    }
    let (x, y) = (i64::from(x), i64::from(y));
    let len = isqrt(x * x + y * y).max(1);
    ((x * 1024 / len) as i32, (y * 1024 / len) as i32)
}

fn isqrt(v: i64) -> i64 {
    if v < 2 {
        return v;
    }
    let mut x = v;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + v / x) / 2;
    }
    x
}
