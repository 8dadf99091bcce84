//! # Primality engine and prime generation
//!
//! Probabilistic primality testing and the searches built on it: plain
//! random primes, ranged primes, safe primes (p = 2q+1), and the
//! congruent-one construction (p = q·r + 1 for a given prime q).
//!
//! ## Trial division by one GCD
//!
//! Instead of dividing a candidate by each small prime in turn, the filter
//! computes a single GCD against a precomputed product of small odd primes
//! sized to the candidate: [`SMALL_PRIME_PRODUCTS`] holds, for each word
//! count from 1 to 32, the product of the primes from 3 upward whose
//! combined bit length fits that many words. A non-unit GCD proves the
//! candidate has a small factor — or *is* one of those small primes, which
//! is equally uninteresting when hunting cryptographic primes.
//!
//! ## Miller–Rabin
//!
//! The candidate minus one is split as `2^s · r` with `r` odd. Base 2 is
//! always tested first through the cheap base-2 exponentiation; further
//! confidence comes from uniformly random witness bases through the
//! sliding-window path. The witness count for a target error level is
//! taken from [`miller_rabin_trials`], keyed by candidate bit length (see
//! "Handbook of Applied Cryptography", chapter 4.24 and table 4.4 — larger
//! candidates need fewer witnesses for the same error bound).
//!
//! ## Generation loops
//!
//! All searches loop until success with no retry cap, matching the
//! statistical reality that a prime of the requested form will be found;
//! rejected candidates are observable through `tracing` debug events.

use tracing::debug;

use crate::barrett::Barrett;
use crate::number::MpNumber;
use crate::word::{self, Word};
use crate::{fill_words, RandomSource};

/// Number of precomputed small-prime products, and so the largest candidate
/// word count served exactly; larger candidates fall back to the last entry.
pub const SMALL_PRIME_PRODUCT_MAX: usize = 32;

// Products of the odd primes starting at 3, one entry per word count: entry
// k multiplies together 3, 5, 7, ... up to the largest prime keeping the
// product within k words. Shared read-only state, never mutated.
static SPP_01: [Word; 1] = /* primes 3 to 53 */ [0xe221f97c30e94e1d];
static SPP_02: [Word; 2] = /* primes 3 to 101 */ [0x5797d47c51681549, 0xd734e4fc4c3eaf7f];
static SPP_03: [Word; 3] = /* primes 3 to 149 */
    [0x1e6d8e2a0ffceafb, 0xbcbfc14a4c3bc1e1, 0x009c6a22a0a7adf5];
static SPP_04: [Word; 4] = /* primes 3 to 193 */
    [0xdbf05b6f5654b3c0, 0xf524355143958688, 0x9f155887819aed2a, 0xc05b93352be98677];
static SPP_05: [Word; 5] = /* primes 3 to 239 */
    [0x3faa5dadb695ce58, 0x4a579328eab20f1f, 0xef00fe27ffc36456, 0x0a65723e27d8884a,
     0xd59da0a992f77529];
static SPP_06: [Word; 6] = /* primes 3 to 281 */
    [0x501201cc51a492a5, 0x44d3900ad4f8b32a, 0x203c858406a4457c, 0xab0b4f805ab18ac6,
     0xeb9572ac6e9394fa, 0x522bffb6f44af2f3];
static SPP_07: [Word; 7] = /* primes 3 to 331 */
    [0x0120eb4d70279230, 0x9ed122fce0488be4, 0x1d0c99f5d8c039ad, 0x058c90b4780500fe,
     0xf39c05cc09817a27, 0xc3e1776a246b6af2, 0x946a10d66eafaedf];
static SPP_08: [Word; 8] = /* primes 3 to 379 */
    [0x106aa9fb7646fa6e, 0xb0813c28c5d5f09f, 0x077ec3ba238bfb99, 0xc1b631a203e81187,
     0x233db117cbc38405, 0x6ef04659a4a11de4, 0x9f7ecb29bada8f98, 0x0decece92e30c48f];
static SPP_09: [Word; 9] = /* primes 3 to 421 */
    [0x0185dbeb2b8b11d3, 0x7633e9dc1eec5415, 0x65c6ce8431d227ee, 0x28f0328a60c90118,
     0xae031cc5a781c824, 0xd1f16d25f4f0cccf, 0xf35e974579072ec8, 0xcaf1ac8eefd5566f,
     0xa15fb94fe34f5d37];
static SPP_10: [Word; 10] = /* primes 3 to 463 */
    [0x833a505cf9922bee, 0xc80265a6d50e1cce, 0xa22f6fec2eb84450, 0xcec64a3c0e10d472,
     0xdd653b9b51d81d0e, 0x3a3142ea49b91e3a, 0x5e21023267bda426, 0x738730cfb8e6e2ae,
     0xc08c9d4bd2420066, 0xdccf95ef49a560b7];
static SPP_11: [Word; 11] = /* primes 3 to 509 */
    [0x309d024bd5380319, 0x2ca334690bafb43a, 0x0abd5840fbeb24d1, 0xf49b633047902bae,
     0x581ca4cba778fdb1, 0x6dc0a6afef960687, 0x16855d9593746604, 0x201f1919b725fcb7,
     0x8ffd0db8e8fa61a1, 0x6e1c0970beb81adc, 0xf49c82dff960d36f];
static SPP_12: [Word; 12] = /* primes 3 to 569 */
    [0x25eac89f8d4da338, 0x337b49850d2d1489, 0x2663177b4010af3d, 0xd23eeb0b228f3832,
     0xffcee2e5cbd1acc9, 0x8f47f251873380ae, 0x10f0ffdd8e602ffa, 0x210f41f669a1570a,
     0x93c158c1a9a8227f, 0xf81a90c5630e9c44, 0x845c755c7df35a7d, 0x430c679a11575655];
static SPP_13: [Word; 13] = /* primes 3 to 607 */
    [0x3383219d26454f06, 0xe2789b7f9c3b940e, 0x03be2105798e3ff7, 0x945bd325997bc262,
     0x025598f88577748e, 0xc7155ff88a1ff4c9, 0x2ce95bd8b015101f, 0x19b73b1481627f9a,
     0x6f83da3a03259fbd, 0x41f92a6e85ac6efa, 0xde195be86e66ba89, 0xb0ab042d3276976c,
     0x3dbeb3d7413ea96d];
static SPP_14: [Word; 14] = /* primes 3 to 647 */
    [0x6e02645460adbd18, 0xcd52ce1a1beab1c0, 0x36e468e9f350d69b, 0x1d357d083a59f778,
     0xc2cc262b4a29ce52, 0x509bcf97349ba2bf, 0x22402d716b32517e, 0x1941e18ace76cbd8,
     0x5809701e70eaef96, 0x9aac365c8a9fea5e, 0xc74d951db361f061, 0xc4d14f000d806db4,
     0xcd939110c7cab492, 0x2f3ea4c4852ca469];
static SPP_15: [Word; 15] = /* primes 3 to 683 */
    [0x008723131f66758a, 0x414bbebb2f8670bf, 0x01dc959d74468901, 0x57c57f40e210c9c2,
     0x74f544697c71cc1d, 0xe2be67a203d8d56f, 0x6c363fca0a78676a, 0x2b9777896ea2db50,
     0xdb31b73751992f73, 0x0def293ebc028877, 0xdf95ac1b4d0c0128, 0x9a0b05e00e6c0bc8,
     0xe61b766ec0943254, 0x1cd70f0fd5a0ce6b, 0x8ab998fb8ab36e0d];
static SPP_16: [Word; 16] = /* primes 3 to 739 */
    [0x02c85ff870f24be8, 0x0f62b1ba6c20bd72, 0xb837efdf121206d8, 0x7db56b7d69fa4c02,
     0x1c107c3ca206fe8f, 0xa7080ef576effc82, 0xf9b10f5750656b77, 0x94b16afd70996e91,
     0xaef6e0ad15e91b07, 0x1ac9b24d98b233ad, 0x86ee055518e58e56, 0x638ef18bac5c74cb,
     0x35bbb6e5dae2783d, 0xd1c0ce7dec4fc70e, 0x5186d411df36368f, 0x061aa36011f30179];
static SPP_17: [Word; 17] = /* primes 3 to 787 */
    [0x16af5c18a2bef8ef, 0xf2278332182d0fbf, 0x0038cc205148b83d, 0x06e3d7d932828b18,
     0xe11e094028c7eaed, 0xa3395017e07d8ae9, 0xb594060451d05f93, 0x084cb481663c94c6,
     0xff980ddeccdb42ad, 0x37097f41a7837fc9, 0x5afe3f18ad76f234, 0x83ae942e0f0c0bc6,
     0xe40016123189872b, 0xe58f6dfc239ca28f, 0xb0cfbf964c8f27ce, 0x05d6c77a01f9d332,
     0x36c9d442ad69ed33];
static SPP_18: [Word; 18] = /* primes 3 to 827 */
    [0x005bfd2583ab7a44, 0x13d4df0f537c686c, 0xa8e6b583e491130e, 0x96dfcc1c05ba298f,
     0x8701314b45bf6ff4, 0xecf372ffe78bccdf, 0xfc18365a6ae5ca41, 0x2794281fbcc762f1,
     0x8ca1eb11fc8efe0b, 0x6bb5a7a09954e758, 0x074256ad443a8e4b, 0xaa2675154c43d626,
     0x464119446e683d08, 0xd4683db5757d1199, 0x9513a9cbe3e67e3a, 0xe501c1c522aa8ba9,
     0xf955789589161feb, 0xc69941a147aa9685];
static SPP_19: [Word; 19] = /* primes 3 to 877 */
    [0x06706918e8355b7f, 0xfd3f024da6b012e2, 0xbb7338f30d51a968, 0x0f3d912035ed70e0,
     0x2d38d422e41812d4, 0xe29d637b318ce6f4, 0xea117321ce8b712d, 0xcca9345fd03ccaf5,
     0x2e75dafcda909cd4, 0xb41a9f8753c8df3d, 0x284198bcb759d059, 0x941360572b7ab25f,
     0x396b9fa37ae0a200, 0xd998ea09167edc30, 0xf9d2c45c7e487029, 0x927500983f7fb4e8,
     0xe85d8e9434a37006, 0x8cebc96060ab2f87, 0x81efeb182d0e724b];
static SPP_20: [Word; 20] = /* primes 3 to 929 */
    [0xa9e9591f7815617e, 0xcabe352fa13445c4, 0xf8e319ba63042e1c, 0xb0a017d0e729a699,
     0x5480da4e5091cab4, 0x12910cf47bb0f24e, 0x5e1db41264b9f96a, 0x2b327e901d9d0a39,
     0x12659a52d3792d52, 0x991bfa964fe7d212, 0x60374c24a04de69d, 0xf5d4e46b249cafc7,
     0x347c6181bd6dc6b8, 0x13a29dc6d4f785ac, 0x7806635513530cd5, 0xdb94de4858c157f0,
     0x30b96bfb6475393b, 0x5f43a549d95c5619, 0x7e274850ad1a6d18, 0xb5eaa41dd42fda55];
static SPP_21: [Word; 21] = /* primes 3 to 971 */
    [0x06e1d136cb78cac5, 0x4da4bfcb6f2c4a24, 0xfcf3796b77719c31, 0xd27915860001f03e,
     0x4347621bf62577e0, 0x280ebfdb77b4f1e9, 0x0f954ecafd198609, 0x68629be91424c37a,
     0x8f320a34444953d5, 0x2c278d6485238798, 0x709d0063e3fa8623, 0xea24bf2a2c5278e7,
     0x4460d05a0a708bd9, 0xc019d632e39e7300, 0x22b9dbb913df73cf, 0xb959dffe348f9623,
     0xf697a822f4a11320, 0xbd044ecc74878f53, 0x0d57d0f076647b0a, 0xb191f543dc08c392,
     0x3167e5ee56c66847];
static SPP_22: [Word; 22] = /* primes 3 to 1013 */
    [0x005ca1a92edd0e81, 0x9619289e1ecfe2d7, 0xf3949eaf363a5fe8, 0xf6fee01ccd480490,
     0x30a1346ab83c4967, 0x8c7d58826caf81ca, 0x1d02473bea8ad400, 0xd1ce270a5743c3cd,
     0x892c3bd93b84525d, 0x8a42071a508fdb8f, 0x32952aaa2384cf5d, 0xf23ed81d10ac0031,
     0xd85d0e95e3c5bb51, 0x71a0e3f12b671f8f, 0xb07965cc353a784b, 0x78f719681326c790,
     0x6e2b7f7b0782848e, 0xeb1aea5bab10b80e, 0x5b7138fc36f7989c, 0xe85b07c2d4d59d42,
     0x1541c765f6c2111d, 0xb82eca06b437f757];
static SPP_23: [Word; 23] = /* primes 3 to 1051 */
    [0x18e5b310229f618d, 0xe0f54782f57fff33, 0x10546ba8efc0a69c, 0xac4b573b749cc43d,
     0xd3ba4df61fe2800d, 0x733f4eb719a6ea7f, 0xa88aebf2d35b26c8, 0x6e89fe0b27e198de,
     0xe12a14da03cef215, 0xe6651c60be9cf337, 0x3620f4aba453eeb9, 0xeb439ba079201376,
     0x0e3cc7f8722f09a4, 0x685a5556b4efd158, 0xb27a6b79b15f161f, 0xecf3fd802767da7a,
     0x37ceb764bebfcc2b, 0x2d833be00b21bb68, 0xeab326b9ebb20cc2, 0xd76273edefa152ad,
     0x531bccbf17e3c78d, 0x5c43d8f6866ad640, 0xfdbbba0fe997b27b];
static SPP_24: [Word; 24] = /* primes 3 to 1093 */
    [0x021bf9497091b8c3, 0x68cc7c8e00c1990c, 0x6027481b79215ac8, 0xa7517749a2151377,
     0x9a993d2958fcb49a, 0x7368029268527994, 0xc6cc1928add41295, 0x96765f4cc3141a04,
     0x4eb1d61578881667, 0x57d8618781813062, 0x032267987df0d471, 0x9cd38f1b7085fca5,
     0x334be3a6003a3ce7, 0xe19aba553e80cc5a, 0xe4060eff6e180666, 0x1da5eeb7d142d3b2,
     0xe40739f1443dee3a, 0x198637f03c062845, 0xeaff3ff27ea38d93, 0x44d8a90222472df0,
     0x7dfb5c9c8ada77cd, 0x0d5b94eff021e02e, 0x307d08010312d57c, 0xb5d975764697842d];
static SPP_25: [Word; 25] = /* primes 3 to 1151 */
    [0xfa1bd62baae1e767, 0x47535af3830fc07d, 0xebcf3ef7e5a8e46b, 0x8937c4afe02aef0a,
     0xce420c7b2c3f2fac, 0xb9dc94e5100a7191, 0xb47cf523520f613b, 0xee8e095a7b06d781,
     0xb6204bde1648e17f, 0x0f1bd4aba00f7e90, 0xd8fc2a05f5f1e832, 0x6e88a4a67e73cae1,
     0xc4a93d89ad6b301b, 0x1f185b130246ab44, 0x5cadc384931189b5, 0x566b3ed9dafba4e6,
     0x59f5446e5a70c8d1, 0x4626b66d0f1ccfbf, 0xd4238b6884af7dd3, 0xa91d2063ceb2c2f7,
     0xf273b1da4cb542ea, 0x62c624cf4fcb0486, 0x138b42a3c1d9593c, 0xe1254fb3214d2b08,
     0x52532bc528bc6467];
static SPP_26: [Word; 26] = /* primes 3 to 1193 */
    [0x239afcd438799705, 0xab8a0cda4802bc8f, 0xb0e87f44a568f618, 0x7c604708dfb79072,
     0xe24b49cb8b2ac531, 0x005cf2982437b16e, 0x027fa01414e3dbf5, 0xbf76681166e276ff,
     0xcf6768550bc1cd9a, 0x1b387ebaaa8550ae, 0xfc10c69c372a0254, 0xb84666ff35044b9a,
     0xa34fcf7c817b33f3, 0x7088a289a17891a7, 0xe66f88e8ec2ba784, 0xb2a09a9102609726,
     0x17a3dbea8463439d, 0x47972d09b0e63752, 0xbac58d339b402dc1, 0xa09915543360cd68,
     0x4df24e437487571d, 0xfaf68f4fe0a93546, 0x66aa84bf84d4448d, 0x2119029166db27bd,
     0x515599cdcd147810, 0x3acf73e7fe62aed9];
static SPP_27: [Word; 27] = /* primes 3 to 1231 */
    [0x0654f0d4cdacb307, 0x5419612fae3cf746, 0xfbab751fd0887955, 0x28adc68d26f32877,
     0xeb1b772db48e49f6, 0xcb445987c4966560, 0xdff8473702bb0fd4, 0xf8b68b5ce2d496a6,
     0x0dc7d7e43c3cb0bf, 0x72665c6e4c86a7ce, 0xb78c9da40f4d90a8, 0xf5dfe2a4dc559b8a,
     0xba10a63a0ca25d3a, 0xdec2c4198b688d80, 0x71c05d3b694f19de, 0xda32955f77fbb577,
     0x27eb652140495e56, 0x2f4a13e8b648daf2, 0x13d1da75e3f04bb0, 0x43fedcd2b2a0cd30,
     0xa4339e3a03b7f3a0, 0xe02a31c28394368c, 0x7f73bbf32712e69e, 0x7ac58373e5f7c7e7,
     0x55e0d645628c5475, 0x6217c0bdf119900b, 0x05ea71dd714fd2c9];
static SPP_28: [Word; 28] = /* primes 3 to 1283 */
    [0x01662c66dab7a4fa, 0xdba4265ac2075912, 0x59e9c885e1330cb6, 0xc91bee92f1b334ff,
     0x384f827cc8057aa7, 0xc3b65fc6de53dcac, 0x2db6d7903febbe07, 0xcc4012326b128eb7,
     0x1afd3136a9e7f786, 0x14648da17b4f50c7, 0xbd4129ca746dab21, 0x09583797fc1c2ecd,
     0x4c0768a81892bd16, 0xdfea8227bcb2b8bf, 0x168a1452370b0863, 0xb299d0888434c213,
     0x2383a6c7b6b4bf20, 0x5addc8da76d2b172, 0xb416f5b0b9a38d87, 0x738c1cca3fe33dd2,
     0xf9b7570e3f663f8b, 0x3416907651b1dd42, 0x2192331d9436304a, 0x0303422f4d420389,
     0x4548a05562ed1c09, 0x1a63309bf1a9df8b, 0xf0c59af912a62c22, 0xe1e1f49bb0115c17];
static SPP_29: [Word; 29] = /* primes 3 to 1307 */
    [0x005cda0c54b07f4f, 0xff0caca07cc89b95, 0x1c021191164be693, 0x6665357ebb2f689c,
     0x7157ea4f98037ce1, 0x5aca14ca3cf1a386, 0xb03e831ee09a8d5c, 0x48d51f5e6646ed8a,
     0x7ec2b955216587f0, 0x7f3c42ee06ae3844, 0x4c776b8c3ef32747, 0x97cd2ac1c7cce7ec,
     0xe75bb0290f5b5a0e, 0x2c96c4600c678a21, 0x0d992d36d441b1fd, 0x682adf0ef289947e,
     0x6d3de1a2af0ca945, 0x859aa1f2b2bb793d, 0x351dbebfe05144ee, 0xfe9c752d75ec602c,
     0x0e0344ddcfcb642b, 0x6cfc872219d69873, 0xb8c4ace3ffd460e9, 0x43d903b45de9d402,
     0x958a41fb5e008a94, 0xc93610814e5e2811, 0xd052c10abfc67bf6, 0x915d44352688091b,
     0x1eb1c7117c91eae5];
static SPP_30: [Word; 30] = /* primes 3 to 1381 */
    [0xa0604bc54c251ade, 0xcf22bf075a150bb1, 0x2a67d65a5045c183, 0x172466270d72a8c6,
     0x3e2dd1c46694a251, 0xf55bca5e7d834c87, 0x2a8d10e5ea91ba4d, 0xcce166f16b1be0ef,
     0xba025bf362f29284, 0xa36db51675c7d25e, 0xac7519925560c7a1, 0xc70470938bdf2818,
     0xed42d04253130bef, 0x0d92e596844e073b, 0xdd40bd156f433f09, 0xbdfd3e38769a485c,
     0xf29380b79c18989c, 0xed0e6ec43bcc7b73, 0x087e1fb94e8cf2d3, 0x475c77605c707f6b,
     0x31f7217c4c628da2, 0xe3263e30a83c1066, 0x1378f41533ca7d71, 0x5d4e2b87c0e142ba,
     0x462e6ffb506e09f9, 0x7850c73e4b3f7a24, 0xca98bda05c0c6ac6, 0x666daad014d2ff3f,
     0x7138fa68ddd5e9f0, 0xe92edcaa62b56483];
static SPP_31: [Word; 31] = /* primes 3 to 1433 */
    [0x4742fdaff7e8231a, 0xded6827758493423, 0x12b13d2f5925c539, 0x82d876ef7ff69e7f,
     0x5b4ff04e8454faea, 0x620dc9600c65fd57, 0x2aecce4c9656588f, 0x79dfb5dfd7f99148,
     0x196c24df6d8c704b, 0xd6ffb8d9cedb8ee8, 0x448d4352d834cef7, 0xfce9b92907eeca6a,
     0xcc107008fa118ff7, 0xedcc0b84207c3eef, 0xdb5ea3ef89c684d8, 0x89c4187a10775358,
     0xc429d4d2a76bb2c3, 0x9f406fdc49dcf4b6, 0xed773586770e4651, 0xcb63c78354d2a578,
     0x5f52816b14d29d62, 0x06d952ca4428030e, 0x2e793590f75f1d07, 0x79363fa6047f0c64,
     0xf3ed6a912dbc4437, 0x673d418400d005ca, 0x9ca42ff6841c84dd, 0xaaff5fb087f85954,
     0x177c5dc0fbfbb491, 0xa1e5e03e5715875c, 0xa02a0fa41fde7abd];
static SPP_32: [Word; 32] = /* primes 3 to 1471 */
    [0x2465a7bd85011e1c, 0x9e0527929fff268c, 0x82ef7efa416863ba, 0xa5acdb0971dba0cc,
     0xac3ee4999345029f, 0x2cf810b99e406aac, 0x5fce5dd69d1c717d, 0xaea5d18ab913f456,
     0x505679bc91c57d46, 0xd9888857862b36e2, 0xede2e473c1f0ab35, 0x9da25271affe15ff,
     0x240e299d0b04f4cd, 0x0e4d7c0e47b1a7ba, 0x007de89aae848fd5, 0xbdcd7f9815564eb0,
     0x60ae14f19cb50c29, 0x1f0bbd8ed1c4c7f8, 0xfc5fba5166200193, 0x9b532d92dac844a8,
     0x431d400c832d039f, 0x5f900b278a75219c, 0x2986140c79045d77, 0x59540854c31504dc,
     0x56f1df5eebe7bee4, 0x47658b917bf696d6, 0x927f2e2428fbeb34, 0x0e515cb9835d6387,
     0x1be8bbe09cf13445, 0x799f2e6778815157, 0x1a93b4c1eee55d1b, 0x9072e0b2f5c4607f];

/// The per-word-count small-prime products, entry k−1 for k-word candidates.
pub static SMALL_PRIME_PRODUCTS: [&[Word]; SMALL_PRIME_PRODUCT_MAX] = [
    &SPP_01, &SPP_02, &SPP_03, &SPP_04, &SPP_05, &SPP_06, &SPP_07, &SPP_08,
    &SPP_09, &SPP_10, &SPP_11, &SPP_12, &SPP_13, &SPP_14, &SPP_15, &SPP_16,
    &SPP_17, &SPP_18, &SPP_19, &SPP_20, &SPP_21, &SPP_22, &SPP_23, &SPP_24,
    &SPP_25, &SPP_26, &SPP_27, &SPP_28, &SPP_29, &SPP_30, &SPP_31, &SPP_32,
];

/// Random-witness count for a roughly constant Miller–Rabin error bound,
/// keyed by candidate bit length: smaller (cheaper) candidates get more
/// witnesses, large ones need only a couple.
pub fn miller_rabin_trials(bits: usize) -> u32 {
    match bits {
        1854.. => 2,
        1223.. => 3,
        927.. => 4,
        747.. => 5,
        627.. => 6,
        543.. => 7,
        480.. => 8,
        431.. => 9,
        393.. => 10,
        361.. => 11,
        335.. => 12,
        314.. => 13,
        295.. => 14,
        279.. => 15,
        265.. => 16,
        253.. => 17,
        242.. => 18,
        232.. => 19,
        223.. => 20,
        216.. => 21,
        209.. => 22,
        202.. => 23,
        196.. => 24,
        191.. => 25,
        186.. => 26,
        182.. => 27,
        178.. => 28,
        174.. => 29,
        170.. => 30,
        167.. => 31,
        164.. => 32,
        161.. => 33,
        160.. => 34,
        _ => 35,
    }
}

/// Error from the ranged prime search when the requested bounds cannot be
/// satisfied (the only failure mode — the searches themselves never give
/// up).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrimeGenError {
    /// `min`/`max` are inconsistent with each other or the bit length.
    #[error("prime search bounds are inconsistent with the requested {bits}-bit length")]
    InvalidRange {
        /// The requested candidate bit length.
        bits: usize,
    },
}

/// Cofactor policy for the congruent-one construction p = q·r + 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cofactor {
    /// No constraint on the cofactor beyond evenness.
    Any,
    /// Keep `q` from dividing the cofactor (checked by GCD once q ≤ r/2).
    CoprimeToQ,
    /// Require r/2 itself to be prime, for the stronger p = 2·q·s + 1
    /// structure with s prime.
    HalfPrime,
}

// --- trial division ---------------------------------------------------------

/// Small-prime trial division by a single GCD against the size-matched
/// product table entry. Returns true when the candidate has no small odd
/// prime factor (and is not itself one of the table's primes). Needs
/// `3 * x.len()` workspace words.
fn small_prime_filter_words_w(x: &[Word], wksp: &mut [Word]) -> bool {
    let n = x.len();
    let (g, rest) = wksp.split_at_mut(n);
    let (spp, ws) = rest.split_at_mut(n);
    if n > SMALL_PRIME_PRODUCT_MAX {
        word::set_ext(spp, SMALL_PRIME_PRODUCTS[SMALL_PRIME_PRODUCT_MAX - 1]);
        word::gcd(g, x, spp, ws);
    } else {
        word::gcd(g, x, SMALL_PRIME_PRODUCTS[n - 1], ws);
    }
    word::is_one(g)
}

/// Trial-division filter over a context's modulus. Needs `3N` workspace
/// words.
pub fn small_prime_filter_w(p: &Barrett, wksp: &mut [Word]) -> bool {
    small_prime_filter_words_w(p.modulus(), wksp)
}

/// Allocating wrapper for [`small_prime_filter_w`].
pub fn small_prime_filter(p: &Barrett) -> bool {
    let mut wksp = vec![0; 3 * p.size()];
    small_prime_filter_w(p, &mut wksp)
}

// --- Miller–Rabin -----------------------------------------------------------

/// One strong-pseudoprime round for witness base 2 via the base-2
/// exponentiation. `r` and `n_minus_1` are the odd part and candidate−1;
/// `s` the power of two split off. Needs `5N+2` workspace words.
fn miller_rabin_base2_w(
    p: &Barrett,
    s: usize,
    r: &[Word],
    n_minus_1: &[Word],
    wksp: &mut [Word],
) -> bool {
    let n = p.size();
    let (acc, rest) = wksp.split_at_mut(n);
    p.two_pow_mod_w(r, acc, rest);
    strong_pseudoprime_chain(p, s, n_minus_1, acc, rest)
}

/// One strong-pseudoprime round for an arbitrary witness base. Needs
/// `5N+2` workspace words.
fn miller_rabin_witness_w(
    p: &Barrett,
    base: &[Word],
    s: usize,
    r: &[Word],
    n_minus_1: &[Word],
    wksp: &mut [Word],
) -> bool {
    let n = p.size();
    let (acc, rest) = wksp.split_at_mut(n);
    p.pow_mod_w(base, r, acc, rest);
    strong_pseudoprime_chain(p, s, n_minus_1, acc, rest)
}

/// The shared squaring chain: starting from base^r, pass if it is 1
/// immediately or reaches −1 within s−1 squarings; anything else proves
/// compositeness.
fn strong_pseudoprime_chain(
    p: &Barrett,
    s: usize,
    n_minus_1: &[Word],
    acc: &mut [Word],
    wksp: &mut [Word],
) -> bool {
    let mut j = 0;
    loop {
        if word::is_one(acc) {
            return j == 0;
        }
        if word::eq(acc, n_minus_1) {
            return true;
        }
        j += 1;
        if j < s {
            p.sqr_mod_in_place_w(acc, wksp);
        } else {
            return false;
        }
    }
}

/// Miller–Rabin test of the context's modulus: the mandatory base-2 round
/// first, then `t` uniformly random witnesses (at least one). Assumes an
/// odd candidate ≥ 3 with its reduction coefficient computed. Needs `8N+2`
/// workspace words.
pub fn miller_rabin_w(p: &Barrett, rng: &mut dyn RandomSource, t: u32, wksp: &mut [Word]) -> bool {
    let n = p.size();
    let (nm1, rest) = wksp.split_at_mut(n);
    let (r, rest) = rest.split_at_mut(n);
    let (base, rest) = rest.split_at_mut(n);

    p.minus_one_into(nm1);
    r.copy_from_slice(nm1);
    let s = word::shr_trailing_zeros(r);
    debug_assert!(s > 0, "candidate must be odd");

    if !miller_rabin_base2_w(p, s, r, nm1, rest) {
        return false;
    }
    for _ in 0..t.max(1) {
        p.random_element_w(rng, base, rest);
        if !miller_rabin_witness_w(p, base, s, r, nm1, rest) {
            return false;
        }
    }
    true
}

/// Allocating wrapper for [`miller_rabin_w`].
pub fn miller_rabin(p: &Barrett, rng: &mut dyn RandomSource, t: u32) -> bool {
    let mut wksp = vec![0; 8 * p.size() + 2];
    miller_rabin_w(p, rng, t, &mut wksp)
}

/// Full probable-prime decision for a candidate already loaded into a
/// context (odd check, trial-division filter, Miller–Rabin). Works for
/// candidates ≥ 3 that are not themselves small primes. Needs `8N+2`
/// workspace words.
pub fn probable_prime_w(p: &Barrett, rng: &mut dyn RandomSource, t: u32, wksp: &mut [Word]) -> bool {
    if !word::is_odd(p.modulus()) {
        return false;
    }
    if !small_prime_filter_w(p, wksp) {
        return false;
    }
    miller_rabin_w(p, rng, t, wksp)
}

/// Allocating wrapper for [`probable_prime_w`].
pub fn probable_prime(p: &Barrett, rng: &mut dyn RandomSource, t: u32) -> bool {
    let mut wksp = vec![0; 8 * p.size() + 2];
    probable_prime_w(p, rng, t, &mut wksp)
}

// --- candidate sampling -----------------------------------------------------

/// Draw a random candidate of exactly `bits` bits into the context's
/// modulus words: mask the excess high bits, fold into `[min, max]`
/// (defaulting to `[2^(bits-1), 2^bits - 1]`), then force the lowest
/// `low_bits` bits set. Needs `2N` workspace words.
fn random_candidate_bits_w(
    p: &mut Barrett,
    bits: usize,
    low_bits: usize,
    min: Option<&MpNumber>,
    max: Option<&MpNumber>,
    rng: &mut dyn RandomSource,
    wksp: &mut [Word],
) {
    let n = p.size();
    debug_assert!(bits > word::WORD_BITS * (n - 1) && bits <= word::WORD_BITS * n);
    let msbclr = word::WORD_BITS * n - bits;
    let (range, lo) = wksp[..2 * n].split_at_mut(n);

    match max {
        Some(mx) => word::set_ext(range, mx.as_words()),
        None => {
            range.fill(Word::MAX);
            range[0] = Word::MAX >> msbclr;
        }
    }
    match min {
        Some(mn) => word::set_ext(lo, mn.as_words()),
        None => {
            lo.fill(0);
            lo[0] = ((1 as Word) << (word::WORD_BITS - 1)) >> msbclr;
        }
    }
    word::sub(range, lo);

    let modl = p.modulus_mut();
    fill_words(rng, modl);
    modl[0] &= Word::MAX >> msbclr;
    while word::gt(modl, range) {
        word::sub(modl, range);
    }
    word::add(modl, lo);
    if low_bits > 0 {
        modl[n - 1] |= Word::MAX >> (word::WORD_BITS - low_bits);
    }
}

// --- prime searches ---------------------------------------------------------

/// The shared candidate loop: sample, trial-divide, optionally require
/// `gcd(candidate - 1, f) = 1`, compute the reduction coefficient, run
/// Miller–Rabin; repeat until a candidate survives everything.
fn random_prime_loop(
    p: &mut Barrett,
    rng: &mut dyn RandomSource,
    bits: usize,
    t: u32,
    min: Option<&MpNumber>,
    max: Option<&MpNumber>,
    f: Option<&MpNumber>,
    wksp: &mut [Word],
) {
    let n = p.size();
    loop {
        // trial-divide before paying for the reduction coefficient
        random_candidate_bits_w(p, bits, 1, min, max, rng, wksp);

        if !small_prime_filter_w(p, wksp) {
            debug!(bits, "candidate rejected by trial division");
            continue;
        }

        if let Some(f) = f {
            let (pm1, rest) = wksp.split_at_mut(n);
            let (fx, rest) = rest.split_at_mut(n);
            let (g, ws) = rest.split_at_mut(n);
            pm1.copy_from_slice(p.modulus());
            word::sub_word(pm1, 1);
            word::set_ext(fx, f.as_words());
            word::gcd(g, pm1, fx, ws);
            if !word::is_one(g) {
                debug!(bits, "candidate rejected by auxiliary congruence");
                continue;
            }
        }

        p.compute_mu_w(wksp);
        if miller_rabin_w(p, rng, t, wksp) {
            return;
        }
        debug!(bits, "candidate rejected by Miller-Rabin");
    }
}

/// Generate a random probable prime of exactly `bits` bits, testing with
/// `t` random Miller–Rabin witnesses beyond the mandatory base 2. With
/// `f`, only accept candidates with `gcd(candidate - 1, f) = 1` — RSA key
/// generation passes the public exponent here so the prime is usable with
/// it.
pub fn random_prime(
    rng: &mut dyn RandomSource,
    bits: usize,
    t: u32,
    f: Option<&MpNumber>,
) -> Barrett {
    let size = bits.div_ceil(word::WORD_BITS);
    let mut p = Barrett::alloc(size);
    let mut wksp = vec![0; 8 * size + 2];
    random_prime_loop(&mut p, rng, bits, t, None, None, f, &mut wksp);
    p
}

/// Ranged variant: generate a probable prime with `min <= p <= max` (either
/// bound optional; `max` must carry exactly `bits` bits, `min` at most
/// that many).
pub fn random_prime_in_range(
    rng: &mut dyn RandomSource,
    bits: usize,
    t: u32,
    min: Option<&MpNumber>,
    max: Option<&MpNumber>,
    f: Option<&MpNumber>,
) -> Result<Barrett, PrimeGenError> {
    if let Some(mn) = min {
        if mn.bits() > bits {
            return Err(PrimeGenError::InvalidRange { bits });
        }
    }
    if let Some(mx) = max {
        if mx.bits() != bits {
            return Err(PrimeGenError::InvalidRange { bits });
        }
    }
    if let (Some(mn), Some(mx)) = (min, max) {
        if mn >= mx {
            return Err(PrimeGenError::InvalidRange { bits });
        }
    }
    let size = bits.div_ceil(word::WORD_BITS);
    let mut p = Barrett::alloc(size);
    let mut wksp = vec![0; 8 * size + 2];
    random_prime_loop(&mut p, rng, bits, t, min, max, f, &mut wksp);
    Ok(p)
}

/// Generate a probable safe prime: p = 2q + 1 with q also prime. The
/// candidate's two lowest bits are forced (p ≡ 3 mod 4), q is derived by
/// halving, and both must survive the trial filter and Miller–Rabin.
pub fn random_safe_prime(rng: &mut dyn RandomSource, bits: usize, t: u32) -> Barrett {
    let size = bits.div_ceil(word::WORD_BITS);
    let mut p = Barrett::alloc(size);
    let mut qwords = vec![0; size];
    let mut wksp = vec![0; 8 * size + 2];
    loop {
        random_candidate_bits_w(&mut p, bits, 2, None, None, rng, &mut wksp);

        qwords.copy_from_slice(p.modulus());
        word::halve(&mut qwords);

        if !small_prime_filter_words_w(&qwords, &mut wksp) {
            continue;
        }
        if !small_prime_filter_w(&p, &mut wksp) {
            debug!(bits, "safe-prime candidate rejected by trial division");
            continue;
        }

        let q = Barrett::new(&qwords);
        if !miller_rabin_w(&q, rng, t, &mut wksp) {
            debug!(bits, "safe-prime candidate rejected: q composite");
            continue;
        }
        p.compute_mu_w(&mut wksp);
        if !miller_rabin_w(&p, rng, t, &mut wksp) {
            debug!(bits, "safe-prime candidate rejected: p composite");
            continue;
        }
        return p;
    }
}

/// Generate a prime p of exactly `bits` bits with p = q·r + 1 for the
/// given prime q, where r = 2s is even by construction. Returns p and the
/// cofactor r. The three [`Cofactor`] policies constrain s: unconstrained,
/// coprime to q, or itself prime. With `f`, additionally require
/// `gcd(p - 1, f) = 1`.
pub fn random_congruent_one(
    rng: &mut dyn RandomSource,
    bits: usize,
    t: u32,
    q: &Barrett,
    f: Option<&MpNumber>,
    cofactor: Cofactor,
) -> (Barrett, MpNumber) {
    let psize = bits.div_ceil(word::WORD_BITS);
    let qbits = q.bits();
    assert!(qbits > 2 && qbits + 1 < bits, "q must be a smaller prime than p");
    let sbits = bits - qbits - 1;
    let ssize = sbits.div_ceil(word::WORD_BITS);

    let mut p = Barrett::alloc(psize);
    let mut s = Barrett::alloc(ssize);
    let mut wksp = vec![0; 8 * psize + 2];

    loop {
        random_candidate_bits_w(&mut s, sbits, 0, None, None, rng, &mut wksp);

        match cofactor {
            Cofactor::Any => {}
            Cofactor::CoprimeToQ => {
                word::set_lsb(s.modulus_mut());
                // r is even and q > 2, so q can only divide r when q <= s
                if word::le_ext(q.modulus(), s.modulus()) {
                    let (qx, rest) = wksp.split_at_mut(ssize);
                    let (g, ws) = rest.split_at_mut(ssize);
                    word::set_ext(qx, q.modulus());
                    word::gcd(g, s.modulus(), qx, ws);
                    if !word::is_one(g) {
                        continue;
                    }
                }
            }
            Cofactor::HalfPrime => word::set_lsb(s.modulus_mut()),
        }

        if cofactor == Cofactor::HalfPrime && !small_prime_filter_w(&s, &mut wksp) {
            continue;
        }

        // p = 2*q*s + 1; the product may run one word past p, but the
        // value itself fits exactly
        {
            let prod = &mut wksp[..ssize + q.size()];
            word::mul(prod, s.modulus(), q.modulus());
            let prod = &wksp[..ssize + q.size()];
            let modl = p.modulus_mut();
            word::set_ext(modl, prod);
            word::double(modl);
            word::add_word(modl, 1);
        }
        if word::bits(p.modulus()) < bits {
            debug!(bits, "congruent-one candidate fell short of the bit length");
            continue;
        }

        if !small_prime_filter_w(&p, &mut wksp) {
            continue;
        }

        if let Some(f) = f {
            let (pm1, rest) = wksp.split_at_mut(psize);
            let (fx, rest) = rest.split_at_mut(psize);
            let (g, ws) = rest.split_at_mut(psize);
            pm1.copy_from_slice(p.modulus());
            word::sub_word(pm1, 1);
            word::set_ext(fx, f.as_words());
            word::gcd(g, pm1, fx, ws);
            if !word::is_one(g) {
                continue;
            }
        }

        if cofactor == Cofactor::HalfPrime {
            let sctx = Barrett::new(s.modulus());
            if !miller_rabin_w(&sctx, rng, miller_rabin_trials(sbits), &mut wksp) {
                debug!(bits, "congruent-one candidate rejected: s composite");
                continue;
            }
        }

        p.compute_mu_w(&mut wksp);
        if !miller_rabin_w(&p, rng, t, &mut wksp) {
            debug!(bits, "congruent-one candidate rejected by Miller-Rabin");
            continue;
        }

        let mut r = MpNumber::from_words(s.modulus());
        r.double_assign();
        return (p, r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng(seed: u64) -> rand_chacha::ChaCha20Rng {
        rand_chacha::ChaCha20Rng::seed_from_u64(seed)
    }

    /// Odd primes by trial division, for cross-checking the tables.
    fn odd_primes_up_to(limit: u64) -> Vec<u64> {
        let mut primes = vec![];
        'outer: for n in (3..=limit).step_by(2) {
            for p in &primes {
                if p * p > n {
                    break;
                }
                if n % p == 0 {
                    continue 'outer;
                }
            }
            primes.push(n);
        }
        primes
    }

    #[test]
    fn product_tables_match_direct_computation() {
        let bounds = [53u64, 101, 149, 193, 239];
        for (k, &bound) in bounds.iter().enumerate() {
            let mut prod = MpNumber::from_word(1);
            for p in odd_primes_up_to(bound) {
                prod = MpNumber::mul(&prod, &MpNumber::from_word(p));
            }
            assert_eq!(
                prod,
                MpNumber::from_words(SMALL_PRIME_PRODUCTS[k]),
                "product of odd primes up to {bound}"
            );
        }
    }

    #[test]
    fn product_tables_grow_by_exactly_one_word() {
        for (k, entry) in SMALL_PRIME_PRODUCTS.iter().enumerate() {
            assert_eq!(entry.len(), k + 1, "entry {k} has the wrong word count");
            assert_ne!(entry[0], 0, "entry {k} wastes its leading word");
        }
    }

    #[test]
    fn witness_count_policy_ladder() {
        assert_eq!(miller_rabin_trials(2048), 2);
        assert_eq!(miller_rabin_trials(1854), 2);
        assert_eq!(miller_rabin_trials(1853), 3);
        assert_eq!(miller_rabin_trials(1024), 4);
        assert_eq!(miller_rabin_trials(512), 8);
        assert_eq!(miller_rabin_trials(160), 34);
        assert_eq!(miller_rabin_trials(64), 35);
    }

    #[test]
    fn miller_rabin_accepts_small_primes() {
        let mut rng = rng(1);
        // from 5 up: witness sampling needs the open interval (1, p-1) to
        // be non-empty
        for p in odd_primes_up_to(1000).into_iter().filter(|&p| p > 3) {
            let ctx = Barrett::new(&[p]);
            assert!(
                miller_rabin(&ctx, &mut rng, 5),
                "Miller-Rabin rejected prime {p}"
            );
        }
    }

    #[test]
    fn primality_agrees_with_sieve_below_ten_thousand() {
        let mut rng = rng(2);
        let primes = odd_primes_up_to(10_000);
        // above the 1-word table bound, so the filter never eats the prime
        for n in (55u64..10_000).step_by(2) {
            let ctx = Barrett::new(&[n]);
            let expect = primes.binary_search(&n).is_ok();
            assert_eq!(
                probable_prime(&ctx, &mut rng, 5),
                expect,
                "probable_prime({n})"
            );
        }
    }

    #[test]
    fn filter_rejects_the_tables_own_primes() {
        // gcd(p, product) = p for the small primes themselves; they count
        // as "too small to be interesting"
        let ctx = Barrett::new(&[53]);
        assert!(!small_prime_filter(&ctx));
        let ctx = Barrett::new(&[59]);
        assert!(small_prime_filter(&ctx));
    }

    #[test]
    fn base2_strong_pseudoprimes_are_rejected() {
        // strong pseudoprimes to base 2 whose factors all clear the
        // one-word trial table: the random witnesses must catch them
        let mut rng = rng(3);
        for spsp in [42_799u64, 49_141, 1_373_653] {
            let ctx = Barrett::new(&[spsp]);
            assert!(
                !probable_prime(&ctx, &mut rng, 35),
                "{spsp} slipped through"
            );
        }
    }

    #[test]
    fn random_prime_has_the_requested_shape() {
        let mut rng = rng(4);
        let p = random_prime(&mut rng, 96, miller_rabin_trials(96), None);
        assert_eq!(p.bits(), 96);
        assert!(word::is_odd(p.modulus()));
        assert!(miller_rabin(&p, &mut rng, 10));
    }

    #[test]
    fn random_prime_honors_the_auxiliary_congruence() {
        let mut rng = rng(5);
        let f = MpNumber::from_word(0x10001);
        let p = random_prime(&mut rng, 80, miller_rabin_trials(80), Some(&f));
        let pm1 = p.minus_one();
        // gcd(p - 1, f) must be 1
        let mut g = vec![0; p.size()];
        let mut fx = vec![0; p.size()];
        let mut ws = vec![0; p.size()];
        word::set_ext(&mut fx, f.as_words());
        word::gcd(&mut g, pm1.as_words(), &fx, &mut ws);
        assert!(word::is_one(&g));
    }

    #[test]
    fn ranged_prime_respects_bounds() {
        let mut rng = rng(6);
        let min = MpNumber::from_hex("e0000000000000000000000000000000").unwrap();
        let max = MpNumber::from_hex("ffffffffffffffffffffffffffffffff").unwrap();
        let p = random_prime_in_range(&mut rng, 128, 10, Some(&min), Some(&max), None)
            .expect("bounds are consistent");
        let pn = p.to_number();
        assert!(pn >= min && pn <= max);
        assert!(miller_rabin(&p, &mut rng, 10));
    }

    #[test]
    fn ranged_prime_rejects_bad_bounds() {
        let mut rng = rng(7);
        let min = MpNumber::from_hex("ffffffffffffffffffffffffffffffff").unwrap();
        assert_eq!(
            random_prime_in_range(&mut rng, 64, 10, Some(&min), None, None),
            Err(PrimeGenError::InvalidRange { bits: 64 })
        );
        let max = MpNumber::from_word(0xffff);
        assert_eq!(
            random_prime_in_range(&mut rng, 64, 10, None, Some(&max), None),
            Err(PrimeGenError::InvalidRange { bits: 64 })
        );
    }

    #[test]
    fn safe_prime_halves_to_a_prime() {
        let mut rng = rng(8);
        let p = random_safe_prime(&mut rng, 128, 10);
        assert_eq!(p.bits(), 128);
        // p ≡ 3 (mod 4) so that (p-1)/2 stays odd
        assert_eq!(p.modulus()[p.size() - 1] & 3, 3);
        let mut qwords = p.modulus().to_vec();
        word::halve(&mut qwords);
        let q = Barrett::new(&qwords);
        assert!(miller_rabin(&q, &mut rng, 10), "q = (p-1)/2 must be prime");
        assert!(miller_rabin(&p, &mut rng, 10));
    }

    #[test]
    fn congruent_one_construction_holds_exactly() {
        let mut rng = rng(9);
        let q = random_prime(&mut rng, 64, miller_rabin_trials(64), None);
        for cofactor in [Cofactor::Any, Cofactor::CoprimeToQ, Cofactor::HalfPrime] {
            let (p, r) = random_congruent_one(&mut rng, 128, 10, &q, None, cofactor);
            assert_eq!(p.bits(), 128, "{cofactor:?}");
            // p == q * r + 1
            let mut qr = MpNumber::mul(&q.to_number(), &r);
            qr.add_word_assign(1);
            assert_eq!(qr, p.to_number(), "{cofactor:?}: p != q*r + 1");
            assert!(miller_rabin(&p, &mut rng, 10));
            if cofactor == Cofactor::HalfPrime {
                let mut half = r.clone();
                word::halve(half.as_words_mut());
                let s = Barrett::new(half.as_words());
                assert!(miller_rabin(&s, &mut rng, 10), "r/2 must be prime");
            }
        }
    }
}
